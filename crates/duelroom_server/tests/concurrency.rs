//! Racing connections against a shared registry from OS threads.

use duelroom_rules::{Cell, Symbol, TicTacToe};
use duelroom_server::{
    ClientMessage, Outbox, RoomId, RoomRegistry, ServerMessage, SessionHandler,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_racing_joiners_fill_exactly_one_seat() {
    let registry = RoomRegistry::default();
    let (outbox, _creator_rx) = Outbox::channel();
    let mut creator = SessionHandler::new(outbox, registry.clone());
    creator.handle(ClientMessage::CreateRoom);
    let room_id = creator.binding().unwrap().room_id().clone();

    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));
    let handles: Vec<_> = (0..contenders)
        .map(|_| {
            let registry = registry.clone();
            let barrier = Arc::clone(&barrier);
            let room_id = room_id.clone();
            thread::spawn(move || {
                let (outbox, mut rx) = Outbox::channel();
                let mut session = SessionHandler::new(outbox, registry);
                barrier.wait();
                session.handle(ClientMessage::JoinRoom { room_id });
                let joined = session.binding().is_some();
                let first = rx.try_recv().ok();
                (joined, first)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|(joined, _)| *joined).count(), 1);
    for (joined, first) in results {
        if !joined {
            assert_eq!(first, Some(ServerMessage::error("Room is full")));
        }
    }
    let seats = registry
        .with_room(room_id.as_str(), |room| room.participants().len())
        .unwrap();
    assert_eq!(seats, 2);
}

#[test]
fn test_racing_moves_never_overwrite_or_skip_turns() {
    let registry = RoomRegistry::default();
    let (x_outbox, _x_rx) = Outbox::channel();
    let mut x = SessionHandler::new(x_outbox, registry.clone());
    x.handle(ClientMessage::CreateRoom);
    let room_id = x.binding().unwrap().room_id().clone();
    let (o_outbox, mut o_rx) = Outbox::channel();
    let mut o = SessionHandler::new(o_outbox, registry.clone());
    o.handle(ClientMessage::JoinRoom {
        room_id: room_id.clone(),
    });
    std::iter::from_fn(|| o_rx.try_recv().ok()).for_each(drop);

    let barrier = Arc::new(Barrier::new(2));
    let spawn_player = |mut session: SessionHandler, order: Vec<usize>| {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                for &index in &order {
                    session.handle(ClientMessage::Move { index });
                }
            }
            session
        })
    };
    let x_thread = spawn_player(x, (0..9).collect());
    let o_thread = spawn_player(o, (0..9).rev().collect());
    let _x = x_thread.join().unwrap();
    let _o = o_thread.join().unwrap();

    let snapshot = registry.get(room_id.as_str()).unwrap();
    let count = |symbol| {
        snapshot
            .board
            .cells()
            .iter()
            .filter(|cell| **cell == Cell::Occupied(symbol))
            .count()
    };
    let (xs, os) = (count(Symbol::X), count(Symbol::O));
    assert!(xs == os || xs == os + 1, "x={xs} o={os}");

    // Every broadcast state O saw is a legal successor of the previous one.
    let states: Vec<_> = std::iter::from_fn(|| o_rx.try_recv().ok())
        .filter_map(|message| match message {
            ServerMessage::GameState { board, .. } => Some(board),
            _ => None,
        })
        .collect();
    for pair in states.windows(2) {
        let changed: Vec<_> = (0..9).filter(|&i| pair[0][i] != pair[1][i]).collect();
        assert_eq!(changed.len(), 1);
        assert_eq!(pair[0][changed[0]], Cell::Empty);
    }
}

#[test]
fn test_creator_always_holds_first_seat_against_guessed_codes() {
    // One-character codes make every live room trivially guessable.
    let registry = RoomRegistry::new(Arc::new(TicTacToe), 1);
    let done = Arc::new(AtomicBool::new(false));

    let guesser = {
        let registry = registry.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let codes: Vec<RoomId> = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
                .chars()
                .map(|c| RoomId::from(c.to_string()))
                .collect();
            while !done.load(Ordering::Relaxed) {
                for code in &codes {
                    let (outbox, _rx) = Outbox::channel();
                    let mut session = SessionHandler::new(outbox, registry.clone());
                    session.handle(ClientMessage::JoinRoom {
                        room_id: code.clone(),
                    });
                    session.disconnect();
                }
            }
        })
    };

    for _ in 0..500 {
        let (outbox, mut rx) = Outbox::channel();
        let mut creator = SessionHandler::new(outbox, registry.clone());
        creator.handle(ClientMessage::CreateRoom);
        assert_eq!(*creator.binding().unwrap().symbol(), Symbol::X);
        assert!(matches!(
            rx.try_recv(),
            Ok(ServerMessage::RoomCreated {
                symbol: Symbol::X,
                ..
            })
        ));
        creator.disconnect();
    }

    done.store(true, Ordering::Relaxed);
    guesser.join().unwrap();
}
