#![cfg(feature = "timeout")]

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use pretty_assertions::assert_eq;
use rand::Rng as _;
use rendezvous::{Channel, RecvTimeoutError, SendTimeoutError};

#[test_log::test]
fn expiring_receivers_never_swallow_values() {
    const SENDERS: usize = 5;

    let channel = Arc::new(Channel::new());

    let senders = (1..=SENDERS)
        .map(|id| {
            let channel = channel.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(rand::rng().random_range(0..20)));
                channel.send(id);
            })
        })
        .collect::<Vec<_>>();

    let mut received = Vec::with_capacity(SENDERS);
    let mut expired = 0_usize;
    while received.len() < SENDERS {
        match channel.recv_timeout(Duration::from_millis(1)) {
            Ok(id) => received.push(id),
            Err(RecvTimeoutError) => expired += 1,
        }
    }

    for sender in senders {
        sender.join().unwrap();
    }

    log::debug!("receiver expired {expired} times");

    received.sort_unstable();
    assert_eq!(received, (1..=SENDERS).collect::<Vec<_>>());
    assert_eq!(channel.waiting_receivers(), 0);
    assert!(!channel.has_message());
}

#[test_log::test]
fn every_value_is_either_delivered_or_handed_back() {
    const SENDERS: usize = 10;
    const TRIALS: usize = 10;

    for trial in 0..TRIALS {
        let channel = Arc::new(Channel::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let senders = (0..SENDERS)
            .map(|id| {
                let channel = channel.clone();
                let finished = finished.clone();
                thread::spawn(move || {
                    let mut rng = rand::rng();
                    thread::sleep(Duration::from_millis(rng.random_range(0..10)));
                    let timeout = Duration::from_millis(rng.random_range(0..10));
                    let result = channel.send_timeout(id, timeout);
                    finished.fetch_add(1, Ordering::SeqCst);
                    result.err().map(SendTimeoutError::into_inner)
                })
            })
            .collect::<Vec<_>>();

        let receiver = thread::spawn({
            let channel = channel.clone();
            let finished = finished.clone();
            move || {
                let mut received = vec![];
                loop {
                    match channel.recv_timeout(Duration::from_millis(2)) {
                        Ok(id) => received.push(id),
                        Err(RecvTimeoutError) => {
                            if finished.load(Ordering::SeqCst) == SENDERS {
                                break received;
                            }
                        }
                    }
                }
            }
        });

        let handed_back = senders
            .into_iter()
            .filter_map(|sender| sender.join().unwrap())
            .collect::<BTreeSet<_>>();
        let received = receiver.join().unwrap();

        let delivered = received.iter().copied().collect::<BTreeSet<_>>();
        assert_eq!(delivered.len(), received.len(), "trial {trial} duplicated a value");
        assert!(
            delivered.is_disjoint(&handed_back),
            "trial {trial} both delivered and handed back a value"
        );
        assert_eq!(
            delivered.union(&handed_back).copied().collect::<Vec<_>>(),
            (0..SENDERS).collect::<Vec<_>>(),
            "trial {trial} lost a value"
        );
        assert_eq!(channel.handoffs(), received.len() as u64);
        assert_eq!(channel.waiting_receivers(), 0);
        assert!(!channel.has_message());
    }
}

#[test_log::test]
fn blocking_sender_is_served_after_receiver_expiry() {
    let channel = Arc::new(Channel::new());

    assert_eq!(
        channel.recv_timeout(Duration::from_millis(10)),
        Err(RecvTimeoutError)
    );

    let sender = thread::spawn({
        let channel = channel.clone();
        move || channel.send("late")
    });

    assert_eq!(channel.recv_timeout(Duration::from_secs(10)), Ok("late"));
    sender.join().unwrap();
}
