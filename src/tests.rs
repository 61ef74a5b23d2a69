//! End-to-end behavior of the data source: scenarios, invariants and queue ordering.

use crate::identity::IdentityIndex;
use crate::merge::plan_add;
use crate::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

type Row = Item<String>;

fn row(uid: &str, hint: f64) -> Row {
    Item::new(format!("Title: {hint:.4}"), uid).with_sort_hint(hint)
}

fn uids(items: &[Row]) -> Vec<&str> {
    items.iter().map(|i| i.uid.as_str()).collect()
}

/// Small deterministic generator for randomized batches.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn assert_ascending_and_disjoint(changes: &ChangeSet) {
    for list in [&changes.remove, &changes.insert, &changes.reload] {
        assert!(list.windows(2).all(|w| w[0] < w[1]), "not ascending: {list:?}");
    }
    let inserted: HashSet<_> = changes.insert.iter().collect();
    assert!(changes.reload.iter().all(|i| !inserted.contains(i)));
    let removed: HashSet<_> = changes.remove.iter().collect();
    assert!(changes.reload.iter().all(|i| !removed.contains(i)));
}

/// Old minus removals must equal new minus insertions, key for key.
fn assert_frames_consistent(old: &[Row], changes: &ChangeSet, new: &[Row]) {
    let survivors: Vec<&str> = old
        .iter()
        .enumerate()
        .filter(|(i, _)| !changes.remove.contains(i))
        .map(|(_, item)| item.uid.as_str())
        .collect();
    let kept: Vec<&str> = new
        .iter()
        .enumerate()
        .filter(|(i, _)| !changes.insert.contains(i))
        .map(|(_, item)| item.uid.as_str())
        .collect();
    assert_eq!(survivors, kept);
}

// ========== Concrete scenarios ==========

#[tokio::test]
async fn test_insert_between_existing_items() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.5)])
        .await
        .unwrap();

    let changes = source.add_and_wait(vec![row("c", 0.3)]).await.unwrap();

    assert_eq!(uids(&changes.sequence), ["a", "c", "b"]);
    assert_eq!(changes.insertions(), &[1]);
    assert!(changes.removals().is_empty());
    assert!(changes.reloads().is_empty());
}

#[tokio::test]
async fn test_refresh_same_slot_is_reload() {
    let source = DataSource::new().unwrap();
    source.add_and_wait(vec![row("x", 0.2)]).await.unwrap();

    let fresh = Item::new("new payload".to_string(), "x").with_sort_hint(0.2);
    let changes = source.add_and_wait(vec![fresh.clone()]).await.unwrap();

    assert_eq!(changes.reloads(), &[0]);
    assert!(changes.removals().is_empty());
    assert!(changes.insertions().is_empty());
    assert_eq!(*changes.sequence, vec![fresh]);
}

#[tokio::test]
async fn test_reset_never_reloads_surviving_identities() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("c", 0.3)])
        .await
        .unwrap();

    let changes = source
        .reset_and_wait(vec![row("a", 0.1), row("b", 0.2)])
        .await
        .unwrap();

    assert_eq!(changes.kind, MutationKind::Reset);
    assert_eq!(changes.removals(), &[0, 1]);
    assert_eq!(changes.insertions(), &[0, 1]);
    assert!(changes.reloads().is_empty());
    assert_eq!(uids(&changes.sequence), ["a", "b"]);
}

#[tokio::test]
async fn test_refresh_in_middle_of_larger_list() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.2), row("c", 0.3), row("d", 0.4)])
        .await
        .unwrap();

    let fresh = Item::new("refreshed".to_string(), "c").with_sort_hint(0.3);
    let changes = source.add_and_wait(vec![fresh]).await.unwrap();

    assert_eq!(changes.reloads(), &[2]);
    assert!(changes.removals().is_empty());
    assert!(changes.insertions().is_empty());
    assert_eq!(source.item_at(2).unwrap().value, "refreshed");
}

// ========== Invariants ==========

/// Upsert then stable sort: ties keep existing items ahead of incoming ones.
fn model_add(current: &[Row], batch: &[Row], cmp: &Comparator<Row>) -> Vec<Row> {
    let mut seen = HashSet::new();
    let mut incoming: Vec<Row> = batch
        .iter()
        .filter(|item| seen.insert(item.uid.clone()))
        .cloned()
        .collect();
    cmp.sort(&mut incoming);

    let mut model: Vec<Row> = current
        .iter()
        .filter(|item| !seen.contains(&item.uid))
        .cloned()
        .collect();
    model.extend(incoming);
    cmp.sort(&mut model);
    model
}

fn model_remove(current: &[Row], batch: &[Row]) -> Vec<Row> {
    let doomed: HashSet<&str> = batch.iter().map(|item| item.uid.as_str()).collect();
    current
        .iter()
        .filter(|item| !doomed.contains(item.uid.as_str()))
        .cloned()
        .collect()
}

/// Every reload slot holds the incoming payload for an identity that sat at
/// the same index before.
fn assert_reloads_in_place(old: &[Row], changes: &ChangeSet, new: &[Row]) {
    for &at in &changes.reload {
        assert_eq!(old[at].uid, new[at].uid, "reload at {at} changed identity");
    }
}

#[tokio::test]
async fn test_random_mutations_keep_invariants() {
    let source = DataSource::new().unwrap();
    let cmp = Comparator::<Row>::by_sort_hint();
    let mut rng = Lcg(0x5eed);

    for round in 0..400 {
        let old = source.items();
        let batch_len = rng.below(6) as usize;
        let batch: Vec<Row> = (0..batch_len)
            .map(|_| {
                let uid = format!("k{}", rng.below(16));
                let hint = rng.below(8) as f64 / 8.0;
                Item::new(format!("{uid}@{round}"), uid).with_sort_hint(hint)
            })
            .collect();

        let (changes, expected) = if round % 4 == 3 {
            let expected = model_remove(&old, &batch);
            (source.remove_and_wait(batch).await.unwrap(), expected)
        } else {
            let expected = model_add(&old, &batch, &cmp);
            (source.add_and_wait(batch).await.unwrap(), expected)
        };
        let new = &changes.sequence;

        assert_eq!(**new, expected, "round {round}: diverged from upsert model");
        assert_eq!(cmp.first_unsorted(new), None, "round {round}: unsorted result");
        let unique: HashSet<_> = new.iter().map(|i| i.uid.as_str()).collect();
        assert_eq!(unique.len(), new.len(), "round {round}: duplicate identity");

        assert_ascending_and_disjoint(&changes.changes);
        assert_frames_consistent(&old, &changes.changes, new);
        assert_reloads_in_place(&old, &changes.changes, new);
        assert_eq!(
            old.len() + changes.insertions().len() - changes.removals().len(),
            new.len()
        );
        assert_eq!(*source.items(), expected);
    }
}

#[tokio::test]
async fn test_refresh_behind_shifted_rows_is_not_reload() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("r", 1.0), row("x", 2.0), row("k", 3.0), row("m", 5.0)])
        .await
        .unwrap();

    let fresh = Item::new("fresh".to_string(), "x").with_sort_hint(4.0);
    let changes = source
        .add_and_wait(vec![fresh, row("r", 10.0)])
        .await
        .unwrap();

    assert_eq!(uids(&changes.sequence), ["k", "x", "m", "r"]);
    assert_eq!(changes.removals(), &[0, 1]);
    assert_eq!(changes.insertions(), &[1, 3]);
    assert!(changes.reloads().is_empty());
    assert_eq!(source.item("x").unwrap().value, "fresh");
}

#[tokio::test]
async fn test_reload_after_earlier_move() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 1.0), row("b", 2.0), row("c", 3.0)])
        .await
        .unwrap();

    let moved = Item::new("moved".to_string(), "a").with_sort_hint(2.5);
    let fresh = Item::new("fresh".to_string(), "c").with_sort_hint(3.0);
    let changes = source.add_and_wait(vec![fresh, moved]).await.unwrap();

    assert_eq!(uids(&changes.sequence), ["b", "a", "c"]);
    assert_eq!(changes.removals(), &[0]);
    assert_eq!(changes.insertions(), &[1]);
    assert_eq!(changes.reloads(), &[2]);
    assert_eq!(changes.sequence[1].value, "moved");
    assert_eq!(changes.sequence[2].value, "fresh");
}

#[tokio::test]
async fn test_duplicate_keys_in_batch_keep_first() {
    let source = DataSource::new().unwrap();
    let changes = source
        .add_and_wait(vec![row("a", 0.5), row("a", 0.1), row("b", 0.2)])
        .await
        .unwrap();

    assert_eq!(uids(&changes.sequence), ["b", "a"]);
    assert_eq!(source.item("a").unwrap().sort_hint, Some(0.5));
}

#[tokio::test]
async fn test_empty_batches_are_noops() {
    let source = DataSource::new().unwrap();
    source.add_and_wait(vec![row("a", 0.1)]).await.unwrap();
    let before = source.items();

    let added = source.add_and_wait(Vec::new()).await.unwrap();
    assert!(added.changes.is_empty());
    assert_eq!(*added.sequence, *before);

    let removed = source.remove_and_wait(Vec::new()).await.unwrap();
    assert!(removed.changes.is_empty());
    assert_eq!(*source.items(), *before);
}

#[tokio::test]
async fn test_remove_reports_old_positions() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.2), row("c", 0.3)])
        .await
        .unwrap();

    let changes = source
        .remove_and_wait(vec![row("c", 0.0), row("a", 0.0)])
        .await
        .unwrap();

    assert_eq!(changes.removals(), &[0, 2]);
    assert!(changes.insertions().is_empty());
    assert_eq!(uids(&changes.sequence), ["b"]);
}

#[tokio::test]
async fn test_comparator_change_resorts_everything() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.2), row("c", 0.3)])
        .await
        .unwrap();

    let by_uid_desc = Comparator::by_key(|item: &Row| item.uid.clone()).reversed();
    let changes = source.set_comparator_and_wait(by_uid_desc).await.unwrap();

    assert_eq!(changes.kind, MutationKind::Resort);
    assert_eq!(changes.removals(), &[0, 1, 2]);
    assert_eq!(changes.insertions(), &[0, 1, 2]);
    assert!(changes.reloads().is_empty());
    assert_eq!(uids(&source.items()), ["c", "b", "a"]);

    // Later units use the new order.
    let changes = source.add_and_wait(vec![row("bb", 0.9)]).await.unwrap();
    assert_eq!(changes.insertions(), &[1]);
}

#[tokio::test]
async fn test_set_comparator_hook_receives_resort() {
    let source = DataSource::new().unwrap();
    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.2)])
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let slot = seen.clone();
    source
        .set_comparator(Comparator::by_sort_hint().reversed(), move |result| {
            *slot.lock().unwrap() = Some(result.map(|c| c.changes));
        })
        .unwrap();
    source.remove_and_wait(Vec::new()).await.unwrap();

    let recorded = seen.lock().unwrap().take().unwrap().unwrap();
    assert_eq!(recorded.insert, vec![0, 1]);
    assert_eq!(uids(&source.items()), ["b", "a"]);
}

// ========== Queue ordering ==========

#[tokio::test]
async fn test_units_complete_in_submission_order() {
    let source = DataSource::new().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut rng = Lcg(42);
    let mut batches = Vec::new();

    for unit in 0..20 {
        let batch: Vec<Row> = (0..3)
            .map(|_| row(&format!("k{}", rng.below(8)), rng.below(10) as f64))
            .collect();
        batches.push(batch.clone());

        let (opened, closed) = (events.clone(), events.clone());
        source
            .add(
                batch,
                move || opened.lock().unwrap().push(format!("before {unit}")),
                move |result| {
                    assert!(result.is_ok());
                    closed.lock().unwrap().push(format!("after {unit}"));
                },
            )
            .unwrap();
    }
    source.remove_and_wait(Vec::new()).await.unwrap();

    let expected_events: Vec<String> = (0..20)
        .flat_map(|unit| [format!("before {unit}"), format!("after {unit}")])
        .collect();
    assert_eq!(*events.lock().unwrap(), expected_events);

    // Same result as applying every batch sequentially.
    let cmp = Comparator::by_sort_hint();
    let mut expected: Vec<Row> = Vec::new();
    for batch in batches {
        let index = IdentityIndex::build(&expected);
        expected = plan_add(&expected, &index, batch, &cmp).sequence;
    }
    assert_eq!(*source.items(), expected);
}

#[tokio::test]
async fn test_submissions_from_many_tasks_all_apply() {
    let source = DataSource::new().unwrap();
    let mut tasks = Vec::new();
    for t in 0..8 {
        let handle = source.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..5 {
                let uid = format!("t{t}-{i}");
                handle
                    .add_and_wait(vec![row(&uid, (t * 5 + i) as f64)])
                    .await
                    .unwrap();
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(source.count(), 40);
    let cmp = Comparator::by_sort_hint();
    assert_eq!(cmp.first_unsorted(&source.items()), None);
}

#[tokio::test]
async fn test_panicking_comparator_fails_only_its_unit() {
    let cmp = Comparator::<Row>::by_sort_hint();
    let guarded = Comparator::new(move |a: &Row, b: &Row| {
        if a.uid == "boom" || b.uid == "boom" {
            panic!("comparator refused boom");
        }
        cmp.compare(a, b)
    });
    let source = DataSource::with_comparator(guarded).unwrap();
    source.add_and_wait(vec![row("a", 0.1)]).await.unwrap();

    let err = source
        .add_and_wait(vec![row("boom", 0.2), row("c", 0.3)])
        .await
        .unwrap_err();
    match err {
        SourceError::UnitPanicked { unit, message } => {
            assert_eq!(unit, 2);
            assert!(message.contains("comparator refused boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(uids(&source.items()), ["a"]);

    let changes = source.add_and_wait(vec![row("d", 0.4)]).await.unwrap();
    assert_eq!(changes.insertions(), &[1]);
    assert_eq!(source.count(), 2);
}

// ========== Completion contexts and subscriptions ==========

#[tokio::test]
async fn test_channel_context_delivers_on_runner() {
    let (context, mut runner) = channel_context();
    let source =
        DataSource::with_config(SourceConfig::default(), Comparator::by_sort_hint(), context)
            .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let (opened, closed) = (events.clone(), events.clone());
    source
        .add(
            vec![row("a", 0.1)],
            move || opened.lock().unwrap().push("begin updates".to_string()),
            move |result| {
                let changes = result.unwrap();
                closed
                    .lock()
                    .unwrap()
                    .push(format!("insert {:?}, end updates", changes.insertions()));
            },
        )
        .unwrap();

    assert!(runner.run_next().await);
    assert_eq!(*events.lock().unwrap(), ["begin updates"]);
    assert!(runner.run_next().await);
    assert_eq!(
        *events.lock().unwrap(),
        ["begin updates", "insert [0], end updates"]
    );
    assert_eq!(source.count(), 1);

    drop(source);
    assert!(!runner.run_next().await);
}

#[tokio::test]
async fn test_subscription_sees_every_commit() {
    let source = DataSource::new().unwrap();
    let mut updates = source.subscribe();

    source
        .add_and_wait(vec![row("a", 0.1), row("b", 0.2)])
        .await
        .unwrap();
    source.remove_and_wait(vec![row("a", 0.1)]).await.unwrap();
    source
        .set_comparator_and_wait(Comparator::by_sort_hint().reversed())
        .await
        .unwrap();

    let kinds: Vec<MutationKind> = [
        updates.next().await.unwrap(),
        updates.next().await.unwrap(),
        updates.next().await.unwrap(),
    ]
    .iter()
    .map(|c| c.kind)
    .collect();
    assert_eq!(
        kinds,
        [MutationKind::Add, MutationKind::Remove, MutationKind::Resort]
    );
    assert!(updates.try_next().is_none());
}

#[tokio::test]
async fn test_failed_unit_is_not_published() {
    let cmp = Comparator::<Row>::new(|a, b| {
        if a.uid == "boom" || b.uid == "boom" {
            panic!("no");
        }
        a.uid.cmp(&b.uid)
    });
    let source = DataSource::with_comparator(cmp).unwrap();
    let mut updates = source.subscribe();

    assert!(source
        .add_and_wait(vec![row("boom", 0.0), row("x", 0.0)])
        .await
        .is_err());
    source.add_and_wait(vec![row("y", 0.0)]).await.unwrap();

    let first = updates.next().await.unwrap();
    assert_eq!(uids(&first.sequence), ["y"]);
}
