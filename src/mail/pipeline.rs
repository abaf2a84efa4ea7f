use std::thread;

use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// Runs `produce` on its own thread, pushing items into a bounded queue, while
/// the calling thread drains the queue through `consume`.
///
/// The producer is always joined before returning. A consumer error wins over
/// the producer's result; dropping the receiver makes further sends fail so the
/// producer can stop early.
///
/// This is a hand-off between the session and the parser, not a streaming
/// reader: a producer that collects its whole response first still holds all
/// of it in memory.
pub fn drain<T, R, P, C>(capacity: usize, produce: P, mut consume: C) -> Result<Vec<R>>
where
    T: Send,
    P: FnOnce(mpsc::Sender<T>) -> Result<()> + Send,
    C: FnMut(T) -> Result<R>,
{
    let (tx, mut rx) = mpsc::channel(capacity.max(1));

    thread::scope(|scope| {
        let producer = scope.spawn(move || produce(tx));

        let mut out = Vec::new();
        let mut failed = None;
        while let Some(item) = rx.blocking_recv() {
            match consume(item) {
                Ok(r) => out.push(r),
                Err(e) => {
                    failed = Some(e);
                    break;
                }
            }
        }
        drop(rx);

        let produced = producer
            .join()
            .unwrap_or_else(|_| Err(Error::Protocol("fetch worker panicked".into())));

        match failed {
            Some(e) => Err(e),
            None => produced.map(|()| out),
        }
    })
}
