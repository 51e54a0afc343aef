// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SchedError};
use crate::types::TaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SchedError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.pool, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_scheduler_section(cfg)?;
    validate_pools(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_task_fits(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SchedError::ConfigError(
            "config must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.batch_size == 0 {
        return Err(SchedError::ConfigError(
            "[scheduler].batch_size must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.scheduler.cycle_interval_ms == 0 || cfg.scheduler.negotiation_interval_ms == 0 {
        return Err(SchedError::ConfigError(
            "[scheduler] tick intervals must be >= 1ms".to_string(),
        ));
    }
    Ok(())
}

fn validate_pools(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pool.is_empty() {
        return Err(SchedError::ConfigError(
            "at least one [[pool]] must be provided".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for pool in &cfg.pool {
        if !seen.insert(pool.name.as_str()) {
            return Err(SchedError::ConfigError(format!(
                "duplicate pool name '{}'",
                pool.name
            )));
        }
        if pool.hosts.is_empty() {
            return Err(SchedError::ConfigError(format!(
                "pool '{}' must declare at least one host",
                pool.name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(SchedError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
            if dep == name {
                return Err(SchedError::ConfigError(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// A compute task larger than every host would sit in the pending set
/// forever; reject it up front.
fn validate_task_fits(cfg: &RawConfigFile) -> Result<()> {
    let largest_host = cfg
        .pool
        .iter()
        .flat_map(|p| p.hosts.iter().copied())
        .max()
        .unwrap_or(0);

    for (name, task) in cfg.task.iter() {
        if task.kind == TaskKind::Compute && task.cores > largest_host {
            return Err(SchedError::ConfigError(format!(
                "task '{}' needs {} cores but the largest host has {}",
                name, task.cores, largest_host
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(SchedError::DagCycle(format!(
                "cycle detected in task DAG involving task '{}'",
                node
            )))
        }
    }
}
