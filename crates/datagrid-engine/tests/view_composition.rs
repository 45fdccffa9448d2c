use datagrid_engine::{DataGrid, GridEvent, PageError};
use datagrid_model::{
    CellValue, ColumnSchema, ColumnType, FilterCriterion, FilterOp, GridSchema, RowId,
    SortDescriptor, SortScope,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn schema() -> GridSchema {
    GridSchema::new(vec![
        ColumnSchema::new("name", ColumnType::Text),
        ColumnSchema::new("value", ColumnType::Number),
    ])
    .unwrap()
}

fn cells(name: &str, value: f64) -> BTreeMap<String, CellValue> {
    BTreeMap::from([
        ("name".to_string(), CellValue::Text(name.to_string())),
        ("value".to_string(), CellValue::Number(value)),
    ])
}

fn grid_with_values(values: &[f64]) -> (DataGrid, Vec<RowId>) {
    let mut grid = DataGrid::new(schema());
    let ids = values
        .iter()
        .enumerate()
        .map(|(i, v)| grid.append(cells(&format!("row{i}"), *v)).unwrap())
        .collect();
    (grid, ids)
}

fn value_above(threshold: f64) -> Vec<FilterCriterion> {
    vec![FilterCriterion::new(
        "value",
        FilterOp::GreaterThan(CellValue::Number(threshold)),
    )]
}

#[test]
fn filter_sort_page_compose_in_that_order() {
    let (mut grid, ids) = grid_with_values(&[10.0, 20.0, 30.0, 40.0, 50.0]);

    let matched = grid.set_criteria(value_above(25.0)).unwrap();
    assert_eq!(matched, 3);
    assert_eq!(grid.get_all(true), vec![ids[2], ids[3], ids[4]]);

    grid.sort(
        vec![SortDescriptor::descending("value")],
        SortScope::FilteredView,
    )
    .unwrap();
    assert_eq!(grid.get_all(true), vec![ids[4], ids[3], ids[2]]);

    let page = grid.get_page(1, 2).unwrap();
    assert_eq!(page.rows, vec![ids[4], ids[3]]);
    assert_eq!(page.total_rows, 3);
    assert_eq!(page.total_pages(), 2);

    let page = grid.get_page(2, 2).unwrap();
    assert_eq!(page.rows, vec![ids[2]]);
    assert!(page.is_last());

    // Past the end: empty page, not an error.
    let page = grid.get_page(9, 2).unwrap();
    assert!(page.rows.is_empty());

    assert_eq!(grid.get_page(1, 0).unwrap_err(), PageError::InvalidPageSize);

    // Paging the unfiltered dataset ignores the filter but keeps its order.
    let page = grid.get_paged(1, 3, false).unwrap();
    assert_eq!(page.rows, vec![ids[0], ids[1], ids[2]]);
    assert_eq!(page.total_rows, 5);
}

#[test]
fn page_serializes_for_host_consumption() {
    let (mut grid, _) = grid_with_values(&[10.0, 20.0, 30.0, 40.0, 50.0]);
    grid.set_criteria(value_above(25.0)).unwrap();
    grid.sort(
        vec![SortDescriptor::descending("value")],
        SortScope::FilteredView,
    )
    .unwrap();

    let page = grid.get_page(1, 2).unwrap();
    assert_eq!(
        serde_json::to_value(&page).unwrap(),
        serde_json::json!({
            "page_number": 1,
            "page_size": 2,
            "total_rows": 3,
            "rows": [5, 4],
        })
    );
}

#[test]
fn filtered_edit_resolves_through_the_index_mapping() {
    let (mut grid, ids) = grid_with_values(&[10.0, 20.0, 30.0, 40.0, 50.0]);
    grid.set_criteria(value_above(25.0)).unwrap();

    // Filtered position 0 is the third stored row, not the first.
    let target = grid.map_filtered_index_to_row_id(0).unwrap();
    assert_eq!(target, ids[2]);
    assert_eq!(grid.map_row_id_to_filtered_index(ids[4]), Some(2));

    grid.update(target, cells("edited", 35.0)).unwrap();
    assert_eq!(
        grid.row(ids[2]).unwrap().cell("name"),
        &CellValue::Text("edited".to_string())
    );
    // Rows outside the filter were untouched.
    assert_eq!(
        grid.row(ids[0]).unwrap().cell("value"),
        &CellValue::Number(10.0)
    );
}

#[test]
fn update_crossing_the_predicate_is_visible_on_the_next_read() {
    let (mut grid, ids) = grid_with_values(&[10.0, 30.0]);
    grid.set_criteria(value_above(25.0)).unwrap();
    assert_eq!(grid.count(true), 1);

    grid.update(ids[0], cells("row0", 40.0)).unwrap();
    assert_eq!(grid.count(true), 2);
    assert_eq!(grid.get_all(true), vec![ids[0], ids[1]]);

    grid.update(ids[1], cells("row1", 5.0)).unwrap();
    assert_eq!(grid.get_all(true), vec![ids[0]]);
}

#[test]
fn clearing_the_filter_restores_the_full_view_and_keeps_the_dataset_sort() {
    let (mut grid, ids) = grid_with_values(&[3.0, 1.0, 2.0]);
    grid.sort(vec![SortDescriptor::ascending("value")], SortScope::All)
        .unwrap();
    grid.set_criteria(value_above(1.5)).unwrap();
    assert_eq!(grid.get_all(true), vec![ids[2], ids[0]]);

    grid.clear_criteria();
    assert_eq!(grid.get_all(true), vec![ids[1], ids[2], ids[0]]);

    grid.clear_sort(SortScope::All);
    assert_eq!(grid.get_all(true), vec![ids[0], ids[1], ids[2]]);
    // Row identities and numbers never moved.
    assert_eq!(grid.row(ids[0]).unwrap().number, 1);
    assert_eq!(grid.row(ids[2]).unwrap().number, 3);
}

#[test]
fn filtered_view_sort_does_not_outlive_the_filter() {
    let (mut grid, ids) = grid_with_values(&[3.0, 1.0, 2.0]);
    grid.set_criteria(value_above(0.0)).unwrap();
    grid.sort(
        vec![SortDescriptor::descending("value")],
        SortScope::FilteredView,
    )
    .unwrap();
    assert_eq!(grid.get_all(true), vec![ids[0], ids[2], ids[1]]);

    grid.clear_criteria();
    // Back to insertion order: the filtered-view sort went with the filter.
    assert_eq!(grid.get_all(true), vec![ids[0], ids[1], ids[2]]);
}

#[test]
fn rejected_criteria_leave_the_previous_filter_intact() {
    let (mut grid, ids) = grid_with_values(&[10.0, 30.0]);
    grid.set_criteria(value_above(25.0)).unwrap();
    assert_eq!(grid.get_all(true), vec![ids[1]]);

    let err = grid
        .set_criteria(vec![FilterCriterion::new("bogus", FilterOp::IsNull)])
        .unwrap_err();
    let datagrid_engine::FilterError::InvalidCriteria { offending } = err;
    assert_eq!(offending.len(), 1);
    // The old filter still governs the view.
    assert_eq!(grid.get_all(true), vec![ids[1]]);
}

#[test]
fn mutations_publish_row_count_and_view_invalidation_events() {
    let mut grid = DataGrid::new(schema());
    let seen: Arc<Mutex<Vec<GridEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = grid.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

    let id = grid.append(cells("a", 1.0)).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            GridEvent::RowCountChanged { total: 1 },
            GridEvent::ViewInvalidated
        ]
    );

    seen.lock().unwrap().clear();
    // A committed edit notifies subscribers even when no filter/sort column
    // is involved.
    grid.update(id, cells("b", 2.0)).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![GridEvent::ViewInvalidated]);

    seen.lock().unwrap().clear();
    // An edit that touches nothing (unknown row) publishes nothing.
    assert!(!grid.update(RowId(99), cells("x", 1.0)).unwrap());
    assert!(seen.lock().unwrap().is_empty());

    grid.remove(id);
    assert_eq!(
        seen.lock().unwrap().first(),
        Some(&GridEvent::RowCountChanged { total: 0 })
    );

    assert!(grid.unsubscribe(sub));
}

#[test]
fn batch_removal_updates_the_view_once() {
    let (mut grid, ids) = grid_with_values(&[1.0, 2.0, 3.0]);
    let outcomes = grid.remove_batch(&[ids[0], RowId(99), ids[2]]);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(grid.count(false), 1);
    assert_eq!(grid.get_all(false), vec![ids[1]]);

    // Atomic variant: unknown id aborts the whole batch.
    let err = grid.remove_batch_atomic(&[ids[1], RowId(99)]).unwrap_err();
    assert_eq!(
        err,
        datagrid_engine::StoreError::RowNotFound { id: RowId(99) }
    );
    assert_eq!(grid.count(false), 1);
}

#[test]
fn insert_at_respects_display_position_under_an_active_sort() {
    let (mut grid, ids) = grid_with_values(&[2.0, 1.0]);
    grid.sort(vec![SortDescriptor::ascending("value")], SortScope::All)
        .unwrap();
    assert_eq!(grid.get_all(false), vec![ids[1], ids[0]]);

    // Canonical insertion position, but the sorted view places it by value.
    let mid = grid.insert_at(0, cells("mid", 1.5)).unwrap();
    assert_eq!(grid.get_all(false), vec![ids[1], mid, ids[0]]);
    assert_eq!(grid.store().order()[0], mid);
}
