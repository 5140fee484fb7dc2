use std::cell::RefCell;
use std::rc::Rc;

use observable_core::{Change, ChangeKind, MutationError, ObservableArray, Outcome};
use serde_json::{json, Value};

fn array_from(values: &[i64]) -> ObservableArray {
    ObservableArray::from_vec(values.iter().map(|n| json!(n)).collect())
}

fn capture_events(array: &ObservableArray) -> Rc<RefCell<Vec<Change>>> {
    let events: Rc<RefCell<Vec<Change>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let _retained = array.observe(move |change: &Change| {
        sink.borrow_mut().push(change.clone());
        Ok(())
    });
    events
}

#[test]
fn splice_removing_one_and_inserting_two_reports_every_field() {
    let array = array_from(&[1, 2, 3]);
    let events = capture_events(&array);

    array.splice(1, 1, vec![json!(9), json!(9)]).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    match events[0].kind() {
        ChangeKind::Splice {
            index,
            removed_count,
            added,
            removed,
        } => {
            assert_eq!(*index, 1);
            assert_eq!(*removed_count, 1);
            assert_eq!(added, &vec![json!(9), json!(9)]);
            assert_eq!(removed, &vec![json!(2)]);
        }
        other => panic!("expected a splice, got {other:?}"),
    }
    assert_eq!(events[0].kind().add_count(), Some(2));
    assert_eq!(array.view(), json!([1, 9, 9, 3]));
}

#[test]
fn structural_convenience_ops_normalize_to_single_splice_events() {
    let array = ObservableArray::new();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let _retained = array.observe(move |change: &Change| {
        if let ChangeKind::Splice {
            index,
            removed_count,
            added,
            ..
        } = change.kind()
        {
            sink.borrow_mut()
                .push(format!("splice({index},{removed_count},+{})", added.len()));
        }
        Ok(())
    });

    array.push(json!("a")).unwrap();
    array.push(json!("b")).unwrap();
    array.insert(1, json!("mid")).unwrap();
    array.remove(0).unwrap();
    array.pop().unwrap();
    array.clear().unwrap();

    assert_eq!(
        log.borrow().join(" "),
        "splice(0,0,+1) splice(1,0,+1) splice(1,0,+1) splice(0,1,+0) splice(1,1,+0) splice(0,1,+0)"
    );
    assert!(array.is_empty());
}

#[test]
fn in_place_replacement_is_an_update_event() {
    let array = array_from(&[10, 20, 30]);
    let events = capture_events(&array);

    array.set(1, json!(21)).unwrap();

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    match events[0].kind() {
        ChangeKind::ArrayUpdate {
            index,
            new_value,
            old_value,
        } => {
            assert_eq!(*index, 1);
            assert_eq!(new_value, &json!(21));
            assert_eq!(old_value, &json!(20));
        }
        other => panic!("expected an array update, got {other:?}"),
    }
    assert_eq!(array.view(), json!([10, 21, 30]));
}

#[test]
fn out_of_bounds_update_fails_before_interception() {
    let array = array_from(&[1]);
    let events = capture_events(&array);

    let err = array.set(3, json!(0)).unwrap_err();
    assert!(matches!(
        err,
        MutationError::IndexOutOfBounds { index: 3, len: 1 }
    ));
    let err = array.remove(5).unwrap_err();
    assert!(matches!(
        err,
        MutationError::IndexOutOfBounds { index: 5, len: 1 }
    ));
    assert!(events.borrow().is_empty());
    assert_eq!(array.view(), json!([1]));
}

#[test]
fn interceptor_may_rewrite_the_added_elements() {
    let array = ObservableArray::new();
    let _retained = array.intercept(|mut change: Change| {
        if let ChangeKind::Splice { added, .. } = change.kind_mut() {
            let doubled: Vec<Value> = added.iter().flat_map(|v| [v.clone(), v.clone()]).collect();
            *added = doubled;
        }
        Ok(Some(change))
    });
    let events = capture_events(&array);

    array.push(json!("x")).unwrap();

    assert_eq!(array.view(), json!(["x", "x"]));
    let events = events.borrow();
    assert_eq!(events[0].kind().add_count(), Some(2));
}

#[test]
fn interceptor_may_widen_the_removed_range() {
    let array = array_from(&[1, 2, 3]);
    let _retained = array.intercept(|mut change: Change| {
        if let ChangeKind::Splice { removed_count, .. } = change.kind_mut() {
            *removed_count = 2;
        }
        Ok(Some(change))
    });
    let events = capture_events(&array);

    array.remove(0).unwrap();

    assert_eq!(array.view(), json!([3]));
    let events = events.borrow();
    match events[0].kind() {
        ChangeKind::Splice {
            removed_count,
            removed,
            ..
        } => {
            // `removed` is captured at apply time, so it reflects the
            // widened range the chain settled on.
            assert_eq!(*removed_count, 2);
            assert_eq!(removed, &vec![json!(1), json!(2)]);
        }
        other => panic!("expected a splice, got {other:?}"),
    }
}

#[test]
fn rewriting_the_splice_index_faults() {
    let array = array_from(&[1, 2, 3]);
    let _retained = array.intercept(|mut change: Change| {
        if let ChangeKind::Splice { index, .. } = change.kind_mut() {
            *index = 0;
        }
        Ok(Some(change))
    });

    let err = array.remove(2).unwrap_err();
    assert!(matches!(
        err,
        MutationError::ReadOnlyField {
            kind: "array splice",
            field: "index",
        }
    ));
    assert_eq!(array.view(), json!([1, 2, 3]));
}

#[test]
fn vetoed_splice_leaves_the_array_identical() {
    let array = array_from(&[1, 2, 3]);
    let _retained = array.intercept(|_change: Change| Ok(None));
    let events = capture_events(&array);

    let outcome = array.splice(0, 3, vec![json!(0)]).unwrap();
    assert_eq!(outcome, Outcome::Vetoed);
    assert!(events.borrow().is_empty());
    assert_eq!(array.view(), json!([1, 2, 3]));
}

#[test]
fn empty_structural_ops_emit_nothing() {
    let array = ObservableArray::new();
    let events = capture_events(&array);

    array.pop().unwrap();
    array.clear().unwrap();
    array.splice(0, 0, Vec::new()).unwrap();

    assert!(events.borrow().is_empty());
}

#[test]
fn splice_positions_are_clamped_to_the_current_length() {
    let array = array_from(&[1, 2]);
    let events = capture_events(&array);

    array.splice(10, 5, vec![json!(3)]).unwrap();

    assert_eq!(array.view(), json!([1, 2, 3]));
    let events = events.borrow();
    match events[0].kind() {
        ChangeKind::Splice {
            index,
            removed_count,
            ..
        } => {
            assert_eq!(*index, 2);
            assert_eq!(*removed_count, 0);
        }
        other => panic!("expected a splice, got {other:?}"),
    }
}
