use proptest::prelude::*;
use std::collections::VecDeque;
use venom_mq::{BoundedQueue, MqError, QueueConfig};

const MAX_MSG: usize = 8;
const CAPACITY: usize = 5;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(Vec<u8>),
    Dequeue,
    DequeueInto(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        // Up to MAX_MSG + 4 so oversized writes are exercised too
        prop::collection::vec(any::<u8>(), 0..=MAX_MSG + 4).prop_map(Op::Enqueue),
        Just(Op::Dequeue),
        (0..=MAX_MSG + 2).prop_map(Op::DequeueInto),
    ]
}

fn small_queue() -> BoundedQueue {
    BoundedQueue::new(QueueConfig {
        max_message_size: MAX_MSG,
        max_queue_size: CAPACITY,
    })
    .unwrap()
}

proptest! {
    #[test]
    fn queue_matches_vecdeque_model(ops in prop::collection::vec(op_strategy(), 0..300)) {
        let queue = small_queue();
        let mut model: VecDeque<Vec<u8>> = VecDeque::new();

        for op in ops {
            match op {
                Op::Enqueue(msg) => {
                    let result = queue.enqueue(&msg);
                    if msg.len() > MAX_MSG {
                        prop_assert_eq!(
                            result,
                            Err(MqError::MessageTooLarge { max: MAX_MSG, got: msg.len() })
                        );
                    } else if model.len() == CAPACITY {
                        prop_assert_eq!(result, Err(MqError::QueueFull));
                    } else {
                        prop_assert_eq!(result, Ok(()));
                        model.push_back(msg);
                    }
                }
                Op::Dequeue => match model.pop_front() {
                    Some(expected) => prop_assert_eq!(queue.dequeue(), Ok(expected)),
                    None => prop_assert_eq!(queue.dequeue(), Err(MqError::QueueEmpty)),
                },
                Op::DequeueInto(buf_len) => {
                    let mut buf = vec![0u8; buf_len];
                    match model.pop_front() {
                        Some(expected) => {
                            let received = queue.dequeue_into(&mut buf).unwrap();
                            prop_assert_eq!(received.len, expected.len());
                            prop_assert_eq!(received.copied, expected.len().min(buf_len));
                            prop_assert_eq!(&buf[..received.copied], &expected[..received.copied]);
                        }
                        None => prop_assert_eq!(queue.dequeue_into(&mut buf), Err(MqError::QueueEmpty)),
                    }
                }
            }

            prop_assert_eq!(queue.len(), model.len());
            prop_assert!(queue.len() <= CAPACITY);
        }
    }

    #[test]
    fn fills_then_drains_in_order(msgs in prop::collection::vec(
        prop::collection::vec(any::<u8>(), 0..=MAX_MSG),
        0..=CAPACITY,
    )) {
        let queue = small_queue();
        for msg in &msgs {
            queue.enqueue(msg).unwrap();
        }
        for msg in &msgs {
            prop_assert_eq!(&queue.dequeue().unwrap(), msg);
        }
        prop_assert_eq!(queue.dequeue(), Err(MqError::QueueEmpty));
    }
}
