//! A synchronous `Observable`: the producer runs to completion inside
//! `subscribe`, so by the time `subscribe` returns every value has been delivered
//! and the subscription is already closed. It returns an empty `Subscription`
//! because there is nothing left to tear down.
//!
//! The second producer fails half way and shows how a returned error reaches the
//! subscriber instead of the caller.
//!
//! To run this example, execute `cargo run --example basic_observable`.

use rxcore::subscribe::{Subscriber, Subscription};
use rxcore::{Observable, Observer, Subscribeable};

fn main() {
    // Squares of 1 to 10.
    let mut squares = Observable::new(|mut subscriber| {
        for i in 1..=10 {
            subscriber.next(i * i);
        }
        subscriber.complete();
        Ok(Subscription::empty())
    });

    // Only `next` is mandatory; `complete` and `error` handlers are optional.
    let mut observer = Subscriber::on_next(|v| println!("Square {}", v));
    observer.on_complete(|| println!("Squares done"));

    // Nothing runs until here. Comment this out and nothing is printed.
    let subscription = squares.subscribe(observer);
    println!("closed after subscribe: {}", subscription.is_closed());

    // Subscribing again runs the producer again from the start.
    squares.subscribe(Subscriber::on_next(|v| println!("Square again {}", v)));

    let mut parse = Observable::new(|mut subscriber| {
        for word in ["1", "2", "three", "4"] {
            subscriber.next(word.parse::<u32>()?);
        }
        subscriber.complete();
        Ok(Subscription::empty())
    });
    parse.subscribe(Subscriber::new(
        |v| println!("Parsed {}", v),
        |e| println!("Parse failed: {}", e),
        || println!("Parsed everything"),
    ));

    println!("`main` function done")
}
