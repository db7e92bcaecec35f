//! Kahn's algorithm layering (spec §4.4 step 4): in-degree-0 domains form
//! the first parallel batch; everything else is sequential with its
//! `depends_on` preserved. A cycle is a hard validation error.

use std::collections::{HashMap, HashSet};

use crm_types::{Domain, SequentialStep};

pub struct Layering {
    pub parallel: Vec<Domain>,
    pub sequential: Vec<SequentialStep>,
}

pub fn layer(domains: &[Domain], edges: &[(Domain, Domain)]) -> Result<Layering, String> {
    let mut in_degree: HashMap<Domain, usize> = domains.iter().map(|d| (*d, 0)).collect();
    let mut dependents: HashMap<Domain, Vec<Domain>> = HashMap::new();
    let mut depends_on: HashMap<Domain, Vec<Domain>> = HashMap::new();

    for (from, to) in edges {
        if !domains.contains(from) || !domains.contains(to) {
            continue;
        }
        *in_degree.entry(*to).or_insert(0) += 1;
        dependents.entry(*from).or_default().push(*to);
        depends_on.entry(*to).or_default().push(*from);
    }

    let mut remaining: HashSet<Domain> = domains.iter().copied().collect();
    let mut frontier: Vec<Domain> = domains.iter().copied().filter(|d| in_degree[d] == 0).collect();
    let parallel = frontier.clone();
    for d in &frontier {
        remaining.remove(d);
    }

    let mut sequential = Vec::new();
    let mut working_in_degree = in_degree.clone();
    while !frontier.is_empty() {
        let mut next_frontier = Vec::new();
        for node in &frontier {
            if let Some(children) = dependents.get(node) {
                for child in children {
                    let degree = working_in_degree.get_mut(child).unwrap();
                    *degree -= 1;
                    if *degree == 0 && remaining.contains(child) {
                        remaining.remove(child);
                        next_frontier.push(*child);
                    }
                }
            }
        }
        for node in &next_frontier {
            if !parallel.contains(node) {
                sequential.push(SequentialStep {
                    domain: *node,
                    depends_on: depends_on.get(node).cloned().unwrap_or_default(),
                    reason: None,
                });
            }
        }
        frontier = next_frontier;
    }

    if !remaining.is_empty() {
        let cycle: Vec<_> = remaining.iter().map(|d| d.as_str()).collect();
        return Err(format!("dependency cycle detected among: {}", cycle.join(", ")));
    }

    Ok(Layering { parallel, sequential })
}
