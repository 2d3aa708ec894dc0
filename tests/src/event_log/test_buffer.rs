use event_log::buffer::EventCircularBuffer;
use event_log::event::event_kind::LogEventKind;
use event_log::event::mysql_event::{BufferedEvent, MysqlEvent};

fn buffered_event(thread_id: u32, query: &[u8], max_query_len: usize) -> Box<BufferedEvent> {
    let mut event = MysqlEvent::new(
        LogEventKind::Query,
        thread_id,
        "u",
        "db",
        1000,
        2000,
        0,
        "1.2.3.4:3306",
    );
    event.set_query(query);
    Box::new(event.to_buffered(max_query_len))
}

#[test]
pub fn test_overflow_keeps_last_n_in_order() {
    let buffer = EventCircularBuffer::new(3);
    for i in 0..5u32 {
        buffer.insert(buffered_event(i, b"SELECT 1", 1024));
    }

    assert_eq!(buffer.len(), 3);
    assert_eq!(buffer.added_count(), 5);
    assert_eq!(buffer.dropped_count(), 2);

    let drained = buffer.drain();
    let ids: Vec<u32> = drained.iter().map(|e| *e.thread_id()).collect();
    assert_eq!(ids, vec![2, 3, 4]);
    assert_eq!(buffer.len(), 0);
    // 计数不随 drain 归零
    assert_eq!(buffer.added_count(), 5);
    assert_eq!(buffer.dropped_count(), 2);
}

#[test]
pub fn test_drain_preserves_insertion_order() {
    let buffer = EventCircularBuffer::new(16);
    for i in 0..10u32 {
        buffer.insert(buffered_event(i, b"SELECT 1", 1024));
    }
    let drained = buffer.drain();
    let ids: Vec<u32> = drained.iter().map(|e| *e.thread_id()).collect();
    assert_eq!(ids, (0..10).collect::<Vec<u32>>());
    assert!(buffer.is_empty());
}

#[test]
pub fn test_zero_capacity_drops_everything() {
    let buffer = EventCircularBuffer::new(0);
    buffer.insert(buffered_event(1, b"SELECT 1", 1024));
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.added_count(), 1);
    assert_eq!(buffer.dropped_count(), 1);
}

#[test]
pub fn test_deep_copy_truncates_and_null_terminates() {
    let buffer = EventCircularBuffer::new(2);
    buffer.insert(buffered_event(1, b"abcdef", 4));
    buffer.insert(buffered_event(2, b"ghij", 4));
    buffer.insert(buffered_event(3, b"k", 4));

    assert_eq!(buffer.added_count(), 3);
    assert_eq!(buffer.dropped_count(), 1);

    let drained = buffer.drain();
    assert_eq!(drained.len(), 2);

    assert_eq!(drained[0].query(), b"ghij");
    assert_eq!(drained[0].query_len(), 4);
    assert_eq!(drained[0].raw_query(), b"ghij\0");

    assert_eq!(drained[1].query(), b"k");
    assert_eq!(drained[1].raw_query(), b"k\0");
}

#[test]
pub fn test_truncation_bound() {
    let event = buffered_event(1, b"abcdef", 4);
    assert_eq!(event.query(), b"abcd");
    assert_eq!(event.query_len(), 4);
    assert_eq!(event.raw_query().last(), Some(&0u8));
}

#[test]
pub fn test_set_capacity_trims_oldest() {
    let buffer = EventCircularBuffer::new(4);
    for i in 0..4u32 {
        buffer.insert(buffered_event(i, b"SELECT 1", 1024));
    }
    buffer.set_capacity(2);
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.dropped_count(), 2);
    let ids: Vec<u32> = buffer.drain().iter().map(|e| *e.thread_id()).collect();
    assert_eq!(ids, vec![2, 3]);
}
