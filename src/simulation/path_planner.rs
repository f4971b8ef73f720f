//! Breadth-first route planning over the road graph

use std::collections::{HashSet, VecDeque};

use super::road_graph::RoadGraph;
use super::types::Coordinate;

/// Finds the shortest (fewest hops) route from `start` to `goal`.
///
/// The returned path includes both ends. Returns `None` when the goal cannot
/// be reached, and also when `start == goal`: a vehicle already standing on
/// its goal has nothing to route. Equal-length routes are resolved by the
/// successor order of the graph.
pub fn bfs_shortest_path(
    graph: &RoadGraph,
    start: Coordinate,
    goal: Coordinate,
) -> Option<Vec<Coordinate>> {
    if start == goal {
        return None;
    }

    let mut explored = HashSet::new();
    let mut queue = VecDeque::from([vec![start]]);

    while let Some(path) = queue.pop_front() {
        let Some(&node) = path.last() else {
            continue;
        };
        if !explored.insert(node) {
            continue;
        }

        for neighbour in graph.successors(node) {
            let mut new_path = path.clone();
            new_path.push(neighbour);
            if neighbour == goal {
                return Some(new_path);
            }
            queue.push_back(new_path);
        }
    }

    None
}
