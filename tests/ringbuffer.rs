use std::collections::VecDeque;

use proptest::prelude::*;
use uart_dma_fifo::{Error, Ringbuffer};

#[derive(Debug, Clone)]
enum Op {
    Push(Vec<u8>),
    Pop(usize),
    Extract,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..12).prop_map(Op::Push),
        (0usize..12).prop_map(Op::Pop),
        Just(Op::Extract),
    ]
}

fn cursors(ring: &Ringbuffer<'_>) -> (usize, usize, usize) {
    (ring.head(), ring.tail(), ring.len())
}

proptest! {
    #[test]
    fn behaves_like_a_bounded_fifo(capacity in 1usize..16, ops in prop::collection::vec(op(), 0..64)) {
        let mut storage = vec![0u8; capacity];
        let mut ring = Ringbuffer::new(&mut storage).unwrap();
        let mut model = VecDeque::new();

        for op in ops {
            let before = cursors(&ring);

            match op {
                Op::Push(data) => {
                    let res = ring.push(&data);
                    if data.len() > capacity - model.len() {
                        prop_assert_eq!(res, Err(Error::Overflow));
                        prop_assert_eq!(cursors(&ring), before);
                    } else {
                        prop_assert_eq!(res, Ok(()));
                        model.extend(data);
                    }
                }
                Op::Pop(n) => {
                    let mut out = vec![0u8; n];
                    let res = ring.pop(&mut out);
                    if n > model.len() {
                        prop_assert_eq!(res, Err(Error::Underflow));
                        prop_assert_eq!(cursors(&ring), before);
                    } else {
                        prop_assert_eq!(res, Ok(()));
                        let expected: Vec<u8> = model.drain(..n).collect();
                        prop_assert_eq!(out, expected);
                    }
                }
                Op::Extract => {
                    let run = model.len().min(capacity - before.1);
                    let chunk = ring.extract_contiguous();
                    prop_assert_eq!(chunk.len(), run);
                    if run > 0 {
                        prop_assert_eq!(chunk.offset(), before.1);
                        prop_assert_eq!(chunk.as_ptr(), ring.as_ptr().wrapping_add(before.1));
                        let expected: Vec<u8> = model.drain(..run).collect();
                        prop_assert_eq!(unsafe { chunk.as_slice() }, &expected[..]);
                    }
                }
            }

            let (head, tail, count) = cursors(&ring);
            prop_assert_eq!(count, model.len());
            prop_assert!(count <= capacity);
            prop_assert!(head < capacity && tail < capacity);
            prop_assert_eq!((head + capacity - tail) % capacity, count % capacity);
        }
    }

    #[test]
    fn drained_in_order_by_chunks(capacity in 1usize..32, skip in 0usize..32, data in prop::collection::vec(any::<u8>(), 0..32)) {
        prop_assume!(data.len() <= capacity);

        let mut storage = vec![0u8; capacity];
        let mut ring = Ringbuffer::new(&mut storage).unwrap();

        // Move the cursors somewhere in the middle first.
        let skip = skip % capacity;
        ring.push(&vec![0; skip]).unwrap();
        ring.extract_contiguous();

        ring.push(&data).unwrap();

        let mut drained = Vec::new();
        let mut chunks = 0;
        loop {
            let chunk = ring.extract_contiguous();
            if chunk.is_empty() {
                break;
            }
            drained.extend_from_slice(unsafe { chunk.as_slice() });
            chunks += 1;
        }

        prop_assert_eq!(drained, data);
        prop_assert!(chunks <= 2);
    }
}
