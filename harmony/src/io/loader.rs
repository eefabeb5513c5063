//! YAML task and plan files, and suite directory discovery.
//!
//! Top-level keys are matched case-insensitively. `variables` and `glossary`
//! are lists of single-key maps; glossary entries are immutable. Scalar
//! values are kept as their string form.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde_yaml::{Mapping, Value};
use tracing::{debug, instrument, warn};

use crate::core::variables::Variables;
use crate::io::config::RunnerConfig;
use crate::model::{Step, Task, TestPlan};
use crate::registry::tasks::TaskRegistry;

/// Plans and tasks discovered in a suite directory.
#[derive(Debug, Default)]
pub struct Suite {
    pub plans: Vec<TestPlan>,
    pub tasks: TaskRegistry,
}

/// Load every plan file in `dir` and every task file in its `tasks_dir`.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_suite(dir: &Path, cfg: &RunnerConfig) -> Result<Suite> {
    if !dir.is_dir() {
        bail!("suite directory {} does not exist", dir.display());
    }

    let mut suite = Suite::default();
    for path in yaml_files(dir)? {
        suite.plans.extend(load_plan_file(&path)?);
    }

    let tasks_dir = dir.join(&cfg.tasks_dir);
    if tasks_dir.is_dir() {
        for path in yaml_files(&tasks_dir)? {
            let task = load_task_file(&path)?;
            suite
                .tasks
                .register(task)
                .with_context(|| format!("register task from {}", path.display()))?;
        }
    } else {
        warn!(dir = %tasks_dir.display(), "task directory not found");
    }

    debug!(plans = suite.plans.len(), tasks = suite.tasks.len(), "suite loaded");
    Ok(suite)
}

/// `*.yml` and `*.yaml` files directly inside `dir`, sorted by path.
pub fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("read entry in {}", dir.display()))?
            .path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"));
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn load_task_file(path: &Path) -> Result<Task> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_task(&contents).with_context(|| format!("parse task file {}", path.display()))
}

pub fn load_plan_file(path: &Path) -> Result<Vec<TestPlan>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_test_plans(&contents).with_context(|| format!("parse plan file {}", path.display()))
}

/// Parse a task definition document.
pub fn parse_task(source: &str) -> Result<Task> {
    let doc: Value = serde_yaml::from_str(source).context("invalid yaml")?;
    let map = doc
        .as_mapping()
        .ok_or_else(|| anyhow!("task file must be a mapping"))?;

    let mut task = Task::new(required_string(map, "name")?);
    task.description = field(map, "description").map(scalar).transpose()?;

    if let Some(prerequisites) = field(map, "prerequisites") {
        let prerequisites = prerequisites
            .as_mapping()
            .ok_or_else(|| anyhow!("'prerequisites' must be a mapping"))?;
        task.setup_tasks = string_list(prerequisites, "setupTasks")?;
        task.execute_prerequisites = string_list(prerequisites, "executePrerequisites")?;
    }

    task.variables = variables(map)?;

    let steps = field(map, "steps")
        .ok_or_else(|| anyhow!("missing required key 'steps'"))?
        .as_sequence()
        .ok_or_else(|| anyhow!("'steps' must be a list"))?;
    for (index, entry) in steps.iter().enumerate() {
        let (name, directives) =
            single_entry(entry).with_context(|| format!("step #{}", index + 1))?;
        let directives = directives
            .as_sequence()
            .ok_or_else(|| anyhow!("step '{name}' must map to a list of directives"))?
            .iter()
            .map(scalar)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("step '{name}'"))?;
        task.steps.push(Step::new(name, directives));
    }

    Ok(task)
}

/// Parse a plan file: a list of plans, or a single plan mapping.
pub fn parse_test_plans(source: &str) -> Result<Vec<TestPlan>> {
    let doc: Value = serde_yaml::from_str(source).context("invalid yaml")?;
    match &doc {
        Value::Sequence(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| parse_plan(entry).with_context(|| format!("plan #{}", index + 1)))
            .collect(),
        Value::Mapping(_) => Ok(vec![parse_plan(&doc)?]),
        Value::Null => Ok(Vec::new()),
        _ => bail!("plan file must be a list of plans"),
    }
}

fn parse_plan(entry: &Value) -> Result<TestPlan> {
    let map = entry
        .as_mapping()
        .ok_or_else(|| anyhow!("plan must be a mapping"))?;
    let name = required_string(map, "name")?;
    let mut plan = TestPlan::new(&name, required_string(map, "environment")?);
    if field(map, "tasks").is_none() {
        bail!("plan '{name}' is missing required key 'tasks'");
    }
    plan.tasks = string_list(map, "tasks")?;
    plan.variables = variables(map).with_context(|| format!("plan '{name}'"))?;
    Ok(plan)
}

/// `variables` (mutable) then `glossary` (immutable) of a task or plan.
fn variables(map: &Mapping) -> Result<Variables> {
    let mut vars = Variables::new();
    for (key, value) in bindings(map, "variables")? {
        vars.set(key, value)?;
    }
    for (key, value) in bindings(map, "glossary")? {
        vars.define_immutable(key, value)
            .with_context(|| "glossary entries must be unique")?;
    }
    Ok(vars)
}

fn bindings(map: &Mapping, key: &str) -> Result<Vec<(String, String)>> {
    let Some(value) = field(map, key).filter(|value| !value.is_null()) else {
        return Ok(Vec::new());
    };
    let entries = value
        .as_sequence()
        .ok_or_else(|| anyhow!("'{key}' must be a list of single-key maps"))?;
    entries
        .iter()
        .map(|entry| {
            let (name, value) = single_entry(entry).with_context(|| format!("'{key}' entry"))?;
            Ok((name, scalar(value)?))
        })
        .collect()
}

/// Look up `key` case-insensitively.
fn field<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.iter().find_map(|(k, v)| {
        k.as_str()
            .filter(|k| k.eq_ignore_ascii_case(key))
            .map(|_| v)
    })
}

fn required_string(map: &Mapping, key: &str) -> Result<String> {
    let value = field(map, key).ok_or_else(|| anyhow!("missing required key '{key}'"))?;
    scalar(value).with_context(|| format!("key '{key}'"))
}

/// Optional list of scalars under `key`.
fn string_list(map: &Mapping, key: &str) -> Result<Vec<String>> {
    match field(map, key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(scalar)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("key '{key}'")),
        Some(_) => bail!("'{key}' must be a list"),
    }
}

/// The only `(key, value)` pair of a single-key map.
fn single_entry(entry: &Value) -> Result<(String, &Value)> {
    let map = entry
        .as_mapping()
        .ok_or_else(|| anyhow!("expected a single-key map"))?;
    let mut pairs = map.iter();
    match (pairs.next(), pairs.next()) {
        (Some((key, value)), None) => Ok((scalar(key)?, value)),
        _ => bail!("expected a single-key map, found {} keys", map.len()),
    }
}

fn scalar(value: &Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        Value::Null => Ok(String::new()),
        Value::Tagged(tagged) => scalar(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => bail!("expected a scalar value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_TASK: &str = r#"
Name: login
description: Sign in with the demo account
prerequisites:
  setupTasks: [seed users]
  executePrerequisites:
    - open home
variables:
  - username: alice
  - attempts: 3
glossary:
  - home: http://shop.test/
steps:
  - Open:
      - load [home]
      - "expect exists #login"
  - Sign in:
      - "type [username] into #user"
      - "click #submit"
"#;

    #[test]
    fn parses_task_file() {
        let task = parse_task(LOGIN_TASK).expect("parse");
        assert_eq!(task.name, "login");
        assert_eq!(task.description.as_deref(), Some("Sign in with the demo account"));
        assert_eq!(task.setup_tasks, vec!["seed users"]);
        assert_eq!(task.execute_prerequisites, vec!["open home"]);
        assert_eq!(task.variables.get("attempts"), Some("3"));
        assert!(task.variables.is_immutable("home"));
        assert!(!task.variables.is_immutable("username"));

        let names: Vec<&str> = task.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Open", "Sign in"]);
        assert_eq!(task.steps[1].directives[0].text, "type [username] into #user");
    }

    #[test]
    fn glossary_overrides_variable_of_same_name() {
        let task = parse_task(
            "name: t\nvariables:\n  - site: a\nglossary:\n  - site: b\nsteps: []\n",
        )
        .expect("parse");
        assert_eq!(task.variables.get("site"), Some("b"));
        assert!(task.variables.is_immutable("site"));
    }

    #[test]
    fn task_without_steps_is_rejected() {
        let err = parse_task("name: lonely\n").expect_err("missing steps");
        assert!(format!("{err:#}").contains("missing required key 'steps'"));
    }

    #[test]
    fn multi_key_step_is_rejected() {
        let err = parse_task("name: t\nsteps:\n  - {a: [x], b: [y]}\n").expect_err("two keys");
        assert!(format!("{err:#}").contains("step #1"));
    }

    #[test]
    fn parses_plan_list() {
        let plans = parse_test_plans(
            r#"
- name: Smoke
  environment: Memory
  tasks: [login, checkout]
  glossary:
    - base: http://shop.test
- NAME: Nightly
  ENVIRONMENT: memory
  TASKS: []
"#,
        )
        .expect("parse");
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].tasks, vec!["login", "checkout"]);
        assert_eq!(plans[0].environment, "Memory");
        assert!(plans[0].variables.is_immutable("base"));
        assert_eq!(plans[1].name, "Nightly");
        assert!(plans[1].tasks.is_empty());
    }

    #[test]
    fn plan_requires_environment() {
        let err = parse_test_plans("- name: p\n  tasks: [a]\n").expect_err("no env");
        assert!(format!("{err:#}").contains("missing required key 'environment'"));
    }

    #[test]
    fn load_suite_reads_plans_and_tasks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path();
        fs::write(dir.join("b.yaml"), "- {name: B, environment: memory, tasks: [login]}\n")
            .expect("write");
        fs::write(dir.join("a.yml"), "- {name: A, environment: memory, tasks: [login]}\n")
            .expect("write");
        fs::write(dir.join("notes.txt"), "ignored").expect("write");
        fs::create_dir(dir.join("testcases")).expect("mkdir");
        fs::write(dir.join("testcases").join("login.yml"), LOGIN_TASK).expect("write");

        let suite = load_suite(dir, &RunnerConfig::default()).expect("load");
        let names: Vec<&str> = suite.plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(suite.tasks.get("login").is_some());
    }

    #[test]
    fn duplicate_task_names_fail_to_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tasks = temp.path().join("testcases");
        fs::create_dir(&tasks).expect("mkdir");
        fs::write(tasks.join("one.yml"), LOGIN_TASK).expect("write");
        fs::write(tasks.join("two.yml"), LOGIN_TASK).expect("write");

        let err = load_suite(temp.path(), &RunnerConfig::default()).expect_err("duplicate");
        assert!(format!("{err:#}").contains("duplicate task name 'login'"));
    }
}
