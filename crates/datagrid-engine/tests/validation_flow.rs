use datagrid_engine::{
    DataGrid, GridEvent, RuleNode, SharedRule, ValidationConfig, ValidationMode, ValidationRule,
};
use datagrid_model::{
    CellValue, ColumnSchema, ColumnType, GridSchema, Row, RowId, RuleResult, Severity,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct RequirePositive;

impl ValidationRule for RequirePositive {
    fn id(&self) -> &str {
        "positive"
    }

    fn validate(&self, row: &Row) -> RuleResult {
        match row.cell("value") {
            CellValue::Number(n) if *n > 0.0 => RuleResult::valid(self.id()),
            _ => RuleResult::invalid(self.id(), Severity::Error, "value must be positive")
                .with_column("value"),
        }
    }
}

struct StuckRule;

impl ValidationRule for StuckRule {
    fn id(&self) -> &str {
        "stuck"
    }

    fn validate(&self, _row: &Row) -> RuleResult {
        std::thread::sleep(Duration::from_secs(60));
        RuleResult::valid(self.id())
    }

    fn timeout(&self) -> Option<Duration> {
        Some(Duration::from_millis(50))
    }
}

fn grid_with_values(values: &[f64]) -> (DataGrid, Vec<RowId>) {
    let mut grid = DataGrid::new(
        GridSchema::new(vec![ColumnSchema::new("value", ColumnType::Number)]).unwrap(),
    );
    let ids = values
        .iter()
        .map(|v| {
            grid.append(BTreeMap::from([(
                "value".to_string(),
                CellValue::Number(*v),
            )]))
            .unwrap()
        })
        .collect();
    (grid, ids)
}

#[test]
fn mode_decision_tracks_the_dataset_size() {
    let mut grid = DataGrid::with_validation_config(
        GridSchema::new(vec![ColumnSchema::new("value", ColumnType::Number)]).unwrap(),
        ValidationConfig {
            max_realtime_rows: 2,
            ..ValidationConfig::default()
        },
    );
    for v in [1.0, 2.0] {
        grid.append(BTreeMap::from([(
            "value".to_string(),
            CellValue::Number(v),
        )]))
        .unwrap();
    }
    assert_eq!(grid.decide_validation_mode(1), ValidationMode::RealTime);

    grid.append(BTreeMap::from([(
        "value".to_string(),
        CellValue::Number(3.0),
    )]))
    .unwrap();
    assert_eq!(grid.decide_validation_mode(1), ValidationMode::Bulk);
}

#[test]
fn validate_row_reports_results_and_publishes_an_event() {
    let (mut grid, ids) = grid_with_values(&[-1.0]);
    let seen: Arc<Mutex<Vec<GridEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    grid.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let rules: Vec<SharedRule> = vec![Arc::new(RequirePositive)];
    let results = grid.validate_row(ids[0], &rules).unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].is_valid);
    assert_eq!(results[0].affected_column.as_deref(), Some("value"));
    assert!(seen
        .lock()
        .unwrap()
        .contains(&GridEvent::ValidationResultsUpdated));

    assert!(grid.validate_row(RowId(99), &rules).is_none());
}

#[test]
fn validate_all_aggregates_per_rule_statistics() {
    let (grid, _) = grid_with_values(&[1.0, -2.0, 3.0]);
    let rules: Vec<SharedRule> = vec![Arc::new(RequirePositive)];
    let report = grid.validate_all(&rules, None).unwrap();

    assert_eq!(report.row_results.len(), 3);
    assert_eq!(report.invalid_row_count(), 1);
    let stats = &report.stats["positive"];
    assert_eq!(stats.executions, 3);
    assert_eq!(stats.errors, 1);
    assert_eq!(grid.validator().stats_snapshot()["positive"].executions, 3);
}

#[test]
fn stuck_rule_times_out_without_stalling_the_grid() {
    let (grid, _) = grid_with_values(&[1.0]);
    let rules: Vec<SharedRule> = vec![Arc::new(StuckRule), Arc::new(RequirePositive)];
    let start = std::time::Instant::now();
    let report = grid.validate_all(&rules, None).unwrap();

    let (_, results) = &report.row_results[0];
    assert_eq!(results[0].severity, Severity::Timeout);
    assert!(!results[0].is_valid);
    assert!(results[1].is_valid);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn rule_trees_combine_leaf_verdicts_through_the_facade() {
    let (grid, ids) = grid_with_values(&[-1.0]);
    let tree = RuleNode::Any(vec![
        RuleNode::Leaf(Arc::new(RequirePositive)),
        RuleNode::Leaf(Arc::new(RequirePositive)),
    ]);
    let (valid, results) = grid.validate_row_tree(ids[0], &tree).unwrap();
    assert!(!valid);
    assert_eq!(results.len(), 2);
}
