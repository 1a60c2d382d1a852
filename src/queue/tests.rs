use super::OrderedQueue;
use chrono::{Duration, TimeZone, Utc};

#[test]
fn test_push_back_then_pop_front_is_fifo() {
    let mut queue = OrderedQueue::new();
    for i in 1..=5 {
        queue.push_back(i);
    }

    let drained: Vec<i32> = std::iter::from_fn(|| queue.pop_front()).collect();
    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
    assert_eq!(queue.len(), 0);
}

#[test]
fn test_push_front_goes_before_existing() {
    let mut queue = OrderedQueue::new();
    queue.push_back("b");
    queue.push_front("a");
    queue.push_back("c");

    assert_eq!(queue.front(), Some(&"a"));
    assert_eq!(queue.back(), Some(&"c"));
    assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn test_pop_front_on_empty_reports_none() {
    let mut queue: OrderedQueue<u8> = OrderedQueue::new();
    assert!(queue.pop_front().is_none());
    assert!(queue.is_empty());
    assert!(queue.front().is_none());
    assert!(queue.back().is_none());
}

#[test]
fn test_removing_only_element_leaves_empty_queue() {
    let mut queue = OrderedQueue::new();
    let handle = queue.push_back(42);

    assert_eq!(queue.remove(handle), Some(42));
    assert_eq!(queue.len(), 0);
    assert!(queue.pop_front().is_none());
    assert!(queue.front().is_none());
    assert!(queue.back().is_none());
}

#[test]
fn test_stale_handle_is_ignored() {
    let mut queue = OrderedQueue::new();
    let first = queue.push_back(1);
    assert_eq!(queue.remove(first), Some(1));

    // The slot is recycled for the next push; the old handle must not reach it.
    let second = queue.push_back(2);
    assert_ne!(first, second);
    assert_eq!(queue.remove(first), None);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.remove(second), Some(2));
}

#[test]
fn test_remove_from_middle_relinks_neighbours() {
    let mut queue = OrderedQueue::new();
    queue.push_back(1);
    let middle = queue.push_back(2);
    queue.push_back(3);

    assert_eq!(queue.remove(middle), Some(2));
    assert_eq!(queue.len(), 2);
    assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(queue.iter().count(), queue.len());
}

#[test]
fn test_insert_by_priority_keeps_non_increasing_order() {
    let mut queue = OrderedQueue::new();
    let inserts = [(3, "a"), (7, "b"), (1, "c"), (7, "d"), (5, "e"), (3, "f")];

    for (priority, value) in inserts {
        queue.insert_by_priority(value, priority);
        let values: Vec<_> = queue.iter().copied().collect();
        let priorities: Vec<i64> = values
            .iter()
            .map(|v| inserts.iter().find(|(_, x)| x == v).map(|(p, _)| *p).unwrap_or_default())
            .collect();
        assert!(
            priorities.windows(2).all(|w| w[0] >= w[1]),
            "priorities out of order: {priorities:?}"
        );
    }

    // Equal priorities keep arrival order.
    assert_eq!(
        queue.iter().copied().collect::<Vec<_>>(),
        vec!["b", "d", "e", "a", "f", "c"]
    );
}

#[test]
fn test_insert_by_timestamp_orders_earliest_first_and_unset_before_set() {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut queue = OrderedQueue::new();

    queue.insert_by_timestamp("late", Some(base + Duration::seconds(30)));
    queue.insert_by_timestamp("early", Some(base));
    queue.insert_by_timestamp("unset-1", None);
    queue.insert_by_timestamp("middle", Some(base + Duration::seconds(10)));
    queue.insert_by_timestamp("unset-2", None);

    assert_eq!(
        queue.iter().copied().collect::<Vec<_>>(),
        vec!["unset-1", "unset-2", "early", "middle", "late"]
    );
}

#[test]
fn test_sort_by_priority_and_timestamp() {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut queue = OrderedQueue::new();
    queue.insert_by_timestamp(1, Some(base + Duration::minutes(2)));
    queue.insert_by_timestamp(2, Some(base));
    queue.insert_by_timestamp(3, None);

    queue.sort_by_timestamp();
    assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);

    let mut queue = OrderedQueue::new();
    queue.push_back("low");
    queue.insert_by_priority("high", 9);
    queue.push_back("mid");
    queue.sort_by_priority();
    assert_eq!(queue.front(), Some(&"high"));
    assert_eq!(queue.len(), 3);
}

#[test]
fn test_clear_drops_everything() {
    let mut queue = OrderedQueue::new();
    let handle = queue.push_back(1);
    queue.push_back_all([2, 3, 4]);
    assert_eq!(queue.len(), 4);

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.remove(handle), None);
    assert_eq!(queue.iter().count(), 0);
}
