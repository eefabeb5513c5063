//! Task definitions keyed by name.

use std::collections::BTreeMap;

use anyhow::{Result, bail};

use crate::model::Task;

#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `task`; names must be unique.
    pub fn register(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            bail!("duplicate task name '{}'", task.name);
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Setup tasks named by `name`; unknown tasks have none.
    pub fn setup_tasks_of(&self, name: &str) -> &[String] {
        self.tasks
            .get(name)
            .map(|task| task.setup_tasks.as_slice())
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = TaskRegistry::new();
        registry.register(Task::new("login")).expect("register");
        let err = registry.register(Task::new("login")).expect_err("duplicate");
        assert!(err.to_string().contains("duplicate task name 'login'"));
    }

    #[test]
    fn setup_tasks_of_unknown_task_is_empty() {
        let mut registry = TaskRegistry::new();
        let mut task = Task::new("checkout");
        task.setup_tasks.push("seed".to_string());
        registry.register(task).expect("register");

        assert_eq!(registry.setup_tasks_of("checkout"), ["seed".to_string()]);
        assert!(registry.setup_tasks_of("ghost").is_empty());
    }
}
