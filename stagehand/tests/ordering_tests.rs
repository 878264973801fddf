/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use stagehand::prelude::*;
use stagehand_test::prelude::*;

use crate::setup::messages::{Note, Tick};
use crate::setup::{eventually, initialize_tracing, recorded, recorder, stage_with, Inbox};

mod setup;

/// Concurrent senders never make one actor run two handlers at once.
///
/// Eight tasks on a multi-thread runtime tell 50 messages each. The handler
/// counts how many invocations are inside it and remembers the maximum.
#[stagehand_test]
async fn handlers_of_one_actor_never_overlap() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(RestartLimiterConfig::default());
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));

    let (a, p, h) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&handled));
    let actor = stage.actor(
        "exclusive",
        Script::new(move |_: &str| {
            let (active, peak, handled) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&h));
            Ok(BehaviorBuilder::new()
                .on_message::<Tick, _>(move |_, _, _| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    for _ in 0..200 {
                        std::hint::spin_loop();
                    }
                    active.fetch_sub(1, Ordering::SeqCst);
                    handled.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()?)
        }),
    )?;

    let senders: Vec<_> = (0..8)
        .map(|sender| {
            let actor = actor.clone();
            tokio::spawn(async move {
                for n in 0..50 {
                    actor.tell(Tick(sender * 100 + n)).expect("actor accepts messages");
                    if rand::random::<bool>() {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for sender in senders {
        sender.await?;
    }

    assert!(eventually(|| handled.load(Ordering::SeqCst) == 400).await);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    stage.shutdown().await?;
    Ok(())
}

/// Messages from one sender arrive in the order they were sent.
#[stagehand_test]
async fn one_sender_is_delivered_in_order() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(RestartLimiterConfig::default());
    let inbox = Inbox::default();
    let actor = stage.actor("orderly", recorder(&inbox))?;

    let sent: Vec<Tick> = (0..500).map(Tick).collect();
    actor.tell_all(sent.iter().copied().map(Message::new), &Headers::new(), None)?;

    assert!(eventually(|| inbox.lock().len() == 500).await);
    assert_eq!(recorded::<Tick>(&inbox), sent);
    stage.shutdown().await?;
    Ok(())
}

/// Every matching handler runs, and fallbacks run only when none matched.
#[stagehand_test]
async fn every_matching_handler_runs() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(RestartLimiterConfig::default());
    let trail: Arc<Mutex<Vec<String>>> = Arc::default();

    let t = Arc::clone(&trail);
    let actor = stage.actor(
        "matcher",
        Script::new(move |_: &str| {
            let mark = |label: &'static str| {
                let trail = Arc::clone(&t);
                move |message: &Message, _: &Envelop, _: &mut Agent<'_>| -> anyhow::Result<()> {
                    trail.lock().push(format!("{label}:{}", describe(message)));
                    Ok(())
                }
            };
            let (typed, big) = (Arc::clone(&t), Arc::clone(&t));
            Ok(BehaviorBuilder::new()
                .on_message::<u32, _>(move |n, _, _| {
                    typed.lock().push(format!("u32:{n}"));
                    Ok(())
                })
                .on_message_where::<u32, _, _>(
                    |n| Ok(*n > 10),
                    move |n, _, _| {
                        big.lock().push(format!("big:{n}"));
                        Ok(())
                    },
                )
                .on_messages([MessageType::of::<u32>(), MessageType::of::<Note>()], mark("listed"))
                .on_no_match(mark("first-fallback"))
                .on_no_match(mark("second-fallback"))
                .build()?)
        }),
    )?;

    actor.tell(5_u32)?;
    actor.tell(20_u32)?;
    actor.tell(Note::new("hi"))?;
    actor.tell(true)?;

    assert!(eventually(|| trail.lock().len() == 8).await);
    assert_eq!(
        *trail.lock(),
        vec![
            "u32:5",
            "listed:5",
            "u32:20",
            "big:20",
            "listed:20",
            "listed:hi",
            "first-fallback:true",
            "second-fallback:true",
        ]
    );
    stage.shutdown().await?;
    Ok(())
}

fn describe(message: &Message) -> String {
    if let Some(n) = message.downcast_ref::<u32>() {
        n.to_string()
    } else if let Some(Note(text)) = message.downcast_ref::<Note>() {
        text.clone()
    } else if let Some(flag) = message.downcast_ref::<bool>() {
        flag.to_string()
    } else {
        String::from("?")
    }
}

/// An equality handler for `None` fires for the null message only.
#[stagehand_test]
async fn equality_with_none_matches_only_the_null_message() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(RestartLimiterConfig::default());
    let nulls = Arc::new(AtomicUsize::new(0));
    let others = Arc::new(AtomicUsize::new(0));

    let (n, o) = (Arc::clone(&nulls), Arc::clone(&others));
    let actor = stage.actor(
        "nullable",
        Script::new(move |_: &str| {
            let (nulls, others) = (Arc::clone(&n), Arc::clone(&o));
            Ok(BehaviorBuilder::new()
                .on_message_equal_to::<String, _>(None, move |message, _, _| {
                    assert!(message.is_null());
                    nulls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .on_no_match(move |_, _, _| {
                    others.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .build()?)
        }),
    )?;

    actor.tell(Message::null())?;
    actor.tell(String::from("x"))?;

    assert!(eventually(|| nulls.load(Ordering::SeqCst) + others.load(Ordering::SeqCst) == 2).await);
    assert_eq!(nulls.load(Ordering::SeqCst), 1);
    assert_eq!(others.load(Ordering::SeqCst), 1);
    stage.shutdown().await?;
    Ok(())
}
