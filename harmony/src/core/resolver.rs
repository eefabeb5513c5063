//! Setup-task dependency ordering for a test plan.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

/// Order `tasks` so every setup task runs exactly once, before the first task
/// that requires it.
///
/// The plan's tasks are first expanded with their transitive setup tasks
/// (setup tasks ahead of the task naming them). That list is then walked in
/// order: each task is yielded and its dependents graph is expanded
/// breadth-first, so a task follows its setup task as soon as all of its own
/// setup tasks have run. Every task is yielded at most once. Tasks caught in
/// a setup cycle never become ready and are skipped.
pub fn dependency_order<'a, F>(tasks: &'a [String], setup_tasks_of: F) -> Vec<String>
where
    F: Fn(&str) -> &'a [String],
{
    let expanded = expand_setup_tasks(tasks, &setup_tasks_of);

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for &task in &expanded {
        for setup in setup_tasks_of(task) {
            dependents.entry(setup.as_str()).or_default().push(task);
        }
    }

    let mut yielded: HashSet<&str> = HashSet::new();
    let mut order = Vec::new();
    let is_ready = |task: &str, yielded: &HashSet<&str>| {
        setup_tasks_of(task)
            .iter()
            .all(|setup| yielded.contains(setup.as_str()))
    };

    for &task in &expanded {
        if yielded.contains(task) || !is_ready(task, &yielded) {
            continue;
        }
        yielded.insert(task);
        order.push(task.to_string());

        let mut queue: VecDeque<&str> = dependents.get(task).cloned().unwrap_or_default().into();
        while let Some(current) = queue.pop_front() {
            if yielded.contains(current) || !is_ready(current, &yielded) {
                continue;
            }
            yielded.insert(current);
            order.push(current.to_string());
            if let Some(next) = dependents.get(current) {
                queue.extend(next.iter().copied());
            }
        }
    }

    for task in &expanded {
        if !yielded.contains(task) {
            warn!(task = %task, "skipping task whose setup tasks can never run (setup cycle)");
        }
    }

    order
}

/// Depth-first expansion: setup tasks precede the task naming them.
fn expand_setup_tasks<'a, F>(tasks: &'a [String], setup_tasks_of: &F) -> Vec<&'a str>
where
    F: Fn(&str) -> &'a [String],
{
    fn visit<'a, F>(
        task: &'a str,
        setup_tasks_of: &F,
        visited: &mut HashSet<&'a str>,
        out: &mut Vec<&'a str>,
    ) where
        F: Fn(&str) -> &'a [String],
    {
        if !visited.insert(task) {
            return;
        }
        for setup in setup_tasks_of(task) {
            visit(setup.as_str(), setup_tasks_of, visited, out);
        }
        out.push(task);
    }

    let mut visited = HashSet::new();
    let mut out = Vec::new();
    for task in tasks {
        visit(task.as_str(), setup_tasks_of, &mut visited, &mut out);
    }
    out
}
