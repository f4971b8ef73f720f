//! Tick-level behaviour of the simulation

use std::collections::HashSet;

use grid_traffic_sim::simulation::{
    classify, CellClass, Coordinate, DestinationId, Direction, Grid, MapLayout, Occupant,
    SimConfig, SimId, SimWorld, SpawnController, StaticKind, SymbolDictionary, VehicleId,
};

fn quiet_config(light_toggle_period: Option<u32>) -> SimConfig {
    SimConfig {
        light_toggle_period,
        spawn_interval: None,
        spawn_points: Vec::new(),
    }
}

fn seeded_world(map: &str, config: SimConfig) -> SimWorld {
    SimWorld::new_with_seed(
        &MapLayout::from_text(map).unwrap(),
        &SymbolDictionary::standard(),
        config,
        11,
    )
    .unwrap()
}

/// 3x3 map: road at the west end, a light in the middle, destination east
fn corridor(light: char, light_toggle_period: Option<u32>) -> (SimWorld, VehicleId, DestinationId) {
    let map = format!("...\n>{}D\n...\n", light);
    let mut world = seeded_world(&map, quiet_config(light_toggle_period));
    let destination = world
        .destinations
        .destination_at(Coordinate::new(2, 1))
        .unwrap();
    let vehicle = world
        .spawn_vehicle(Coordinate::new(0, 1), destination)
        .unwrap();
    (world, vehicle, destination)
}

/// Checks the invariants that must hold between any two ticks
fn assert_consistent(world: &SimWorld) {
    for vehicle in world.vehicles.values() {
        if let Some(head) = vehicle.path.first() {
            assert_eq!(*head, vehicle.position, "path head of {:?}", vehicle.id);
        }
        let cell = world.grid.cell(vehicle.position).unwrap();
        assert!(cell.vehicles().any(|id| id == vehicle.id));
    }

    for (coord, cell) in world.grid.iter() {
        if !matches!(cell.static_occupant(), Some(Occupant::Destination(_))) {
            assert!(cell.vehicles().count() <= 1, "{} holds several vehicles", coord);
        }
    }

    let stats = world.stats();
    let log = world.destinations.arrival_log();
    assert_eq!(stats.total_arrived as usize, log.len());
    assert!(stats.total_arrived <= stats.total_spawned);
    assert_eq!(
        stats.total_spawned as usize,
        stats.active_vehicles + stats.total_arrived as usize
    );

    let unique: HashSet<VehicleId> = log.iter().map(|a| a.vehicle).collect();
    assert_eq!(unique.len(), log.len(), "a vehicle arrived twice");
}

#[test]
fn test_green_light_corridor() {
    let (mut world, vehicle, destination) = corridor('s', Some(10));

    world.tick();
    world.tick();
    assert_eq!(
        world.vehicle(vehicle).unwrap().position,
        Coordinate::new(1, 1)
    );

    world.tick();
    world.tick();
    assert!(world.vehicle(vehicle).is_none());
    assert_eq!(world.destinations.get(destination).unwrap().arrivals, 1);
    assert_eq!(world.destinations.arrival_log()[0].vehicle, vehicle);
    assert!(!world.grid.cell(Coordinate::new(2, 1)).unwrap().has_vehicle());
}

#[test]
fn test_red_light_blocks_until_forced_green() {
    let (mut world, vehicle, destination) = corridor('S', None);

    world.tick();
    for _ in 0..20 {
        world.tick();
        let v = world.vehicle(vehicle).unwrap();
        assert_eq!(v.position, Coordinate::new(0, 1));
        assert!(v.blocked);
    }
    assert_eq!(world.render_map()[1], "BRD");

    let light = world.lights.light_at(Coordinate::new(1, 1)).unwrap();
    world.lights.set_open(light, true).unwrap();
    world.tick();

    let v = world.vehicle(vehicle).unwrap();
    assert_eq!(v.position, Coordinate::new(1, 1));
    assert!(!v.blocked);

    world.tick();
    assert_eq!(world.destinations.get(destination).unwrap().arrivals, 1);
}

#[test]
fn test_red_light_turns_green_on_period() {
    let (mut world, vehicle, _) = corridor('S', Some(10));

    for _ in 0..10 {
        world.tick();
        assert_eq!(
            world.vehicle(vehicle).unwrap().position,
            Coordinate::new(0, 1)
        );
    }

    // The flip at step 10 happens after the vehicles moved
    world.tick();
    assert_eq!(
        world.vehicle(vehicle).unwrap().position,
        Coordinate::new(1, 1)
    );
}

#[test]
fn test_lights_toggle_together_once_per_period() {
    let mut world = seeded_world(">S>\n>s>\n", quiet_config(Some(3)));
    let states = |world: &SimWorld| -> Vec<bool> {
        world.light_views().iter().map(|l| l.open).collect()
    };

    let initial = states(&world);
    assert_eq!(initial.len(), 2);
    let flipped: Vec<bool> = initial.iter().map(|s| !s).collect();

    for step in 1..=9u64 {
        world.tick();
        let expected = if (step / 3) % 2 == 1 { &flipped } else { &initial };
        assert_eq!(&states(&world), expected, "step {}", step);
    }
}

#[test]
fn test_time_to_change_is_reported_but_not_used() {
    let world = seeded_world(">S>", quiet_config(Some(3)));
    let light = world.light_views()[0];
    assert_eq!(light.time_to_change, 10);
    assert_eq!(world.lights.period(), Some(3));
}

#[test]
fn test_classify_cells() {
    let (mut world, vehicle, _) = corridor('s', None);
    let west = Coordinate::new(0, 1);
    let light = Coordinate::new(1, 1);
    let destination = Coordinate::new(2, 1);

    assert_eq!(classify(&world.grid, &world.lights, light), CellClass::Go);
    assert_eq!(classify(&world.grid, &world.lights, destination), CellClass::Go);
    // Road already holding a vehicle
    assert_eq!(classify(&world.grid, &world.lights, west), CellClass::Switch);
    // Empty ground and off-grid cells
    assert_eq!(
        classify(&world.grid, &world.lights, Coordinate::new(0, 0)),
        CellClass::Wait
    );
    assert_eq!(
        classify(&world.grid, &world.lights, Coordinate::new(5, 5)),
        CellClass::Wait
    );

    world.tick();
    world.tick();
    assert_eq!(world.vehicle(vehicle).unwrap().position, light);
    assert_eq!(classify(&world.grid, &world.lights, light), CellClass::Switch);

    let id = world.lights.light_at(light).unwrap();
    world.lights.set_open(id, false).unwrap();
    assert_eq!(classify(&world.grid, &world.lights, light), CellClass::Wait);
}

#[test]
fn test_vehicle_swerves_around_stalled_vehicle() {
    let map = ".....\n>>>>D\n>>>>.\nD....\n";
    let mut world = seeded_world(map, quiet_config(None));
    let goal = Coordinate::new(4, 2);
    let main = world.destinations.destination_at(goal).unwrap();
    let unreachable = world
        .destinations
        .destination_at(Coordinate::new(0, 0))
        .unwrap();

    // Parked in the upper lane with nowhere it can get to
    let stalled = world
        .spawn_vehicle(Coordinate::new(1, 2), unreachable)
        .unwrap();
    let driver = world.spawn_vehicle(Coordinate::new(0, 2), main).unwrap();

    world.tick();
    assert_eq!(
        world.vehicle(driver).unwrap().path.get(1),
        Some(&Coordinate::new(1, 2))
    );

    world.tick();
    let v = world.vehicle(driver).unwrap();
    assert_eq!(v.position, Coordinate::new(1, 1));
    assert!(!v.blocked);
    assert_eq!(v.path.first(), Some(&Coordinate::new(1, 1)));
    assert_eq!(v.path.last(), Some(&goal));

    for _ in 0..10 {
        world.tick();
        assert_consistent(&world);
    }

    assert!(world.vehicle(driver).is_none());
    assert_eq!(world.destinations.get(main).unwrap().arrivals, 1);

    let s = world.vehicle(stalled).unwrap();
    assert_eq!(s.position, Coordinate::new(1, 2));
    assert!(s.path.is_empty());
}

#[test]
fn test_waiting_vehicle_queues_behind_blocked_one() {
    let map = "....\n>>SD\n....\n";
    let mut world = seeded_world(map, quiet_config(None));
    let destination = world
        .destinations
        .destination_at(Coordinate::new(3, 1))
        .unwrap();

    let front = world
        .spawn_vehicle(Coordinate::new(1, 1), destination)
        .unwrap();
    let back = world
        .spawn_vehicle(Coordinate::new(0, 1), destination)
        .unwrap();

    for _ in 0..5 {
        world.tick();
        assert_consistent(&world);
    }

    assert_eq!(world.vehicle(front).unwrap().position, Coordinate::new(1, 1));
    assert_eq!(world.vehicle(back).unwrap().position, Coordinate::new(0, 1));
    assert!(world.vehicle(front).unwrap().blocked);
    assert!(world.vehicle(back).unwrap().blocked);
}

#[test]
fn test_spawn_controller_never_stacks_vehicles() {
    let mut grid = Grid::new(2, 1).unwrap();
    let home = Coordinate::new(0, 0);
    grid.place(home, Occupant::Road(Direction::Right)).unwrap();

    let destination = DestinationId(SimId(0));
    let mut spawner = SpawnController::new(home);

    let first = spawner.try_spawn(&mut grid, VehicleId(SimId(0)), destination);
    assert!(first.is_some());
    assert!(!spawner.is_clear(&grid));

    let second = spawner.try_spawn(&mut grid, VehicleId(SimId(1)), destination);
    assert!(second.is_none());
    assert_eq!(grid.cell(home).unwrap().vehicles().count(), 1);
    assert_eq!(spawner.spawned, 1);
}

#[test]
fn test_periodic_spawning_waits_for_clear_cell() {
    let config = SimConfig {
        light_toggle_period: None,
        spawn_interval: Some(1),
        spawn_points: vec![Coordinate::new(0, 0)],
    };
    let mut world = seeded_world(">>>>D", config);

    world.tick();
    assert_eq!(world.stats().total_spawned, 1);

    // The first vehicle spends this tick planning and still sits on the spawn
    world.tick();
    assert_eq!(world.stats().total_spawned, 1);

    world.tick();
    assert_eq!(world.stats().total_spawned, 2);

    let ids: Vec<VehicleId> = world.vehicle_views().iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![VehicleId(SimId(0)), VehicleId(SimId(1))]);
    assert_consistent(&world);
}

#[test]
fn test_no_spawn_without_destinations() {
    let config = SimConfig {
        light_toggle_period: None,
        spawn_interval: Some(1),
        spawn_points: vec![Coordinate::new(0, 0)],
    };
    let mut world = seeded_world(">>>", config);
    for _ in 0..5 {
        world.tick();
    }
    assert_eq!(world.stats().total_spawned, 0);
    assert_eq!(world.spawn_from_all(), 0);
}

#[test]
fn test_spawn_point_must_be_on_road() {
    let config = SimConfig {
        spawn_points: vec![Coordinate::new(2, 0)],
        ..quiet_config(None)
    };
    let result = SimWorld::new(
        &MapLayout::from_text(">>D").unwrap(),
        &SymbolDictionary::standard(),
        config,
    );
    assert!(result.is_err());
}

#[test]
fn test_manual_spawn_rejects_bad_cells() {
    let mut world = seeded_world(">#D\n>>.\n", quiet_config(None));
    let destination = world
        .destinations
        .destination_at(Coordinate::new(2, 1))
        .unwrap();

    assert!(world.spawn_vehicle(Coordinate::new(1, 1), destination).is_err());
    assert!(world.spawn_vehicle(Coordinate::new(2, 0), destination).is_err());
    assert!(world.spawn_vehicle(Coordinate::new(9, 9), destination).is_err());
    assert!(world
        .spawn_vehicle(Coordinate::new(0, 0), DestinationId(SimId(99)))
        .is_err());

    world.spawn_vehicle(Coordinate::new(0, 0), destination).unwrap();
    assert!(world.spawn_vehicle(Coordinate::new(0, 0), destination).is_err());
    assert_eq!(world.stats().total_spawned, 1);
}

#[test]
fn test_unroutable_vehicle_stays_inert() {
    let mut world = seeded_world("<<D\n>>.\n", quiet_config(None));
    let destination = world
        .destinations
        .destination_at(Coordinate::new(2, 1))
        .unwrap();
    // The upper lane runs away from the destination
    let vehicle = world
        .spawn_vehicle(Coordinate::new(1, 1), destination)
        .unwrap();

    for _ in 0..50 {
        world.tick();
        let v = world.vehicle(vehicle).unwrap();
        assert_eq!(v.position, Coordinate::new(1, 1));
        assert!(v.path.is_empty());
    }
    assert_eq!(world.destinations.total_arrivals(), 0);
}

#[test]
fn test_demo_world_invariants_hold_every_tick() {
    let mut world = SimWorld::create_test_world_with_seed(42).unwrap();

    for _ in 0..300 {
        world.tick();
        assert_consistent(&world);
    }

    let stats = world.stats();
    assert_eq!(stats.step, 300);
    assert!(stats.total_spawned > 0);
    assert!(stats.total_arrived > 0, "nobody arrived: {:?}", stats);

    let counted: u32 = world.destination_views().iter().map(|d| d.arrivals).sum();
    assert_eq!(counted, stats.total_arrived);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let mut first = SimWorld::create_test_world_with_seed(9).unwrap();
    let mut second = SimWorld::create_test_world_with_seed(9).unwrap();

    for _ in 0..120 {
        first.tick();
        second.tick();
    }

    assert_eq!(first.vehicle_views(), second.vehicle_views());
    assert_eq!(first.destination_views(), second.destination_views());
    assert_eq!(first.render_map(), second.render_map());
}

#[test]
fn test_static_views_list_roads_and_obstacles() {
    let world = seeded_world(">#D\n>>.\n", quiet_config(None));
    let views = world.static_views();

    let roads = views
        .iter()
        .filter(|v| matches!(v.kind, StaticKind::Road(_)))
        .count();
    let obstacles = views
        .iter()
        .filter(|v| v.kind == StaticKind::Obstacle)
        .count();
    assert_eq!(roads, 3);
    assert_eq!(obstacles, 1);
    assert_eq!(world.destination_views().len(), 1);
    assert!(world.light_views().is_empty());
}

#[test]
fn test_swerve_skips_foreign_destinations() {
    let map = ".D.\n>>D\nD..\n";
    let mut world = seeded_world(map, quiet_config(None));
    let goal = world
        .destinations
        .destination_at(Coordinate::new(2, 1))
        .unwrap();
    let unreachable = world
        .destinations
        .destination_at(Coordinate::new(0, 0))
        .unwrap();

    let stalled = world
        .spawn_vehicle(Coordinate::new(1, 1), unreachable)
        .unwrap();
    let driver = world.spawn_vehicle(Coordinate::new(0, 1), goal).unwrap();

    // The only free successors of (0, 1) are the destinations at (1, 2)
    // and (0, 0), neither of which the driver is heading for
    for _ in 0..6 {
        world.tick();
    }

    let v = world.vehicle(driver).unwrap();
    assert_eq!(v.position, Coordinate::new(0, 1));
    assert!(v.blocked);
    assert_eq!(world.vehicle(stalled).unwrap().position, Coordinate::new(1, 1));
    assert_eq!(world.destinations.total_arrivals(), 0);
}

#[test]
fn test_demo_world_vehicles_never_park_on_foreign_destinations() {
    for seed in [1, 7, 11, 42] {
        let mut world = SimWorld::create_test_world_with_seed(seed).unwrap();

        for _ in 0..400 {
            world.tick();
            for vehicle in world.vehicles.values() {
                assert_eq!(
                    world.destinations.destination_at(vehicle.position),
                    None,
                    "seed {}: vehicle {:?} stuck on a destination at {}",
                    seed,
                    vehicle.id,
                    vehicle.position
                );
            }
        }

        let stats = world.stats();
        assert!(stats.total_arrived > 0, "seed {}: {:?}", seed, stats);
    }
}

#[test]
fn test_red_light_ends_swerve_scan() {
    // (0, 1) tries (0, 2) first, then the light at (1, 2), then (1, 1)
    let map = "D..\n>SD\n>>.\n...\n";
    let mut world = seeded_world(map, quiet_config(None));
    let top = world
        .destinations
        .destination_at(Coordinate::new(0, 3))
        .unwrap();
    let behind_light = world
        .destinations
        .destination_at(Coordinate::new(2, 2))
        .unwrap();

    let stalled = world
        .spawn_vehicle(Coordinate::new(0, 2), behind_light)
        .unwrap();
    let driver = world.spawn_vehicle(Coordinate::new(0, 1), top).unwrap();

    world.tick();
    assert_eq!(
        world.vehicle(driver).unwrap().path.get(1),
        Some(&Coordinate::new(0, 2))
    );
    assert_eq!(
        world.vehicle(stalled).unwrap().path.get(1),
        Some(&Coordinate::new(1, 2))
    );

    for _ in 0..5 {
        world.tick();
        let v = world.vehicle(driver).unwrap();
        assert_eq!(v.position, Coordinate::new(0, 1));
        assert!(v.blocked);
    }

    // The free road past the light was never tried
    assert!(!world.grid.cell(Coordinate::new(1, 1)).unwrap().has_vehicle());
    assert_eq!(world.vehicle(stalled).unwrap().position, Coordinate::new(0, 2));
}

#[test]
fn test_step_advances_like_tick() {
    let (mut world, vehicle, _) = corridor('s', None);

    world.step();
    world.step();
    assert_eq!(world.current_step, 2);
    assert_eq!(
        world.vehicle(vehicle).unwrap().position,
        Coordinate::new(1, 1)
    );
}
