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


use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use stagehand::prelude::*;
use stagehand_test::prelude::*;

use crate::setup::messages::{Boom, Note};
use crate::setup::{eventually, initialize_tracing, recorded, recorder, stage_with, Inbox};

mod setup;

type Trail = Arc<Mutex<Vec<String>>>;

/// A worker that records what it handles and fails on the first [`Boom`].
fn fragile(trail: &Trail, starts: &Arc<AtomicUsize>) -> SupervisedRole<impl Role> {
    let trail = Arc::clone(trail);
    let starts = Arc::clone(starts);
    let failed_once = Arc::new(AtomicBool::new(false));
    SupervisedRole::new(Script::new(move |_: &str| {
        let (booms, notes, starts, failed_once) = (
            Arc::clone(&trail),
            Arc::clone(&trail),
            Arc::clone(&starts),
            Arc::clone(&failed_once),
        );
        Ok(BehaviorBuilder::new()
            .on_start(move |_| {
                starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_message::<Boom, _>(move |Boom(text), _, _| {
                booms.lock().push(text.clone());
                if failed_once.swap(true, Ordering::SeqCst) {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("{text} went off"))
                }
            })
            .on_message::<Note, _>(move |Note(text), _, _| {
                notes.lock().push(text.clone());
                Ok(())
            })
            .build()?)
    }))
}

/// A supervisor that counts failures and answers with `decision`, if any.
fn overseer(decision: Option<Recovery>, failures: &Arc<AtomicUsize>) -> impl Role {
    let failures = Arc::clone(failures);
    Script::new(move |_: &str| {
        let failures = Arc::clone(&failures);
        Ok(BehaviorBuilder::new()
            .on_message::<SupervisedFailure, _>(move |failure, envelop, agent| {
                failures.fetch_add(1, Ordering::SeqCst);
                if let Some(recovery) = decision {
                    agent.reply(
                        envelop,
                        SupervisedRecovery {
                            failure_id: failure.failure_id,
                            recovery,
                        },
                    )?;
                }
                Ok(())
            })
            .build()?)
    })
}

fn instant_restarts() -> RestartLimiterConfig {
    RestartLimiterConfig {
        initial_backoff_ms: 0,
        ..RestartLimiterConfig::default()
    }
}

fn with_receipt(actor: &Actor, message: impl std::any::Any + Send + Sync, sender: &Actor) -> anyhow::Result<()> {
    actor.tell_with(Message::new(message), Headers::new().with_receipt(), Some(sender.clone()))?;
    Ok(())
}

/// `Retry` handles the failed message again before anything held back.
#[stagehand_test]
async fn retry_replays_the_failed_message_first() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::default(), Arc::default());
    let boss = stage.actor("boss", overseer(Some(Recovery::Retry), &failures))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    worker.tell(Boom(String::from("boom")))?;
    worker.tell(Note::new("a"))?;
    worker.tell(Note::new("b"))?;

    assert!(eventually(|| trail.lock().len() == 4).await);
    assert_eq!(*trail.lock(), vec!["boom", "boom", "a", "b"]);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(worker.state(), State::Started);
    stage.shutdown().await?;
    Ok(())
}

/// `Resume` bounces the failed message and carries on with the rest.
#[stagehand_test]
async fn resume_bounces_the_failed_message() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::default(), Arc::default());
    let inbox = Inbox::default();
    let client = stage.actor("client", recorder(&inbox))?;
    let boss = stage.actor("boss", overseer(Some(Recovery::Resume), &failures))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    with_receipt(&worker, Boom(String::from("boom")), &client)?;
    with_receipt(&worker, Note::new("after"), &client)?;

    assert!(eventually(|| !recorded::<Bounced>(&inbox).is_empty() && !recorded::<Receipt>(&inbox).is_empty()).await);
    let bounced = recorded::<Bounced>(&inbox);
    assert_eq!(bounced.len(), 1);
    assert_eq!(bounced[0].message.downcast_ref::<Boom>(), Some(&Boom(String::from("boom"))));
    assert!(matches!(&bounced[0].reason, BounceReason::Failed(cause) if cause.contains("went off")));
    assert_eq!(recorded::<Receipt>(&inbox)[0].actor_id, "worker");
    assert_eq!(*trail.lock(), vec!["boom", "after"]);
    stage.shutdown().await?;
    Ok(())
}

/// `RestartAndRetry` starts a fresh incarnation that gets the failed message.
#[stagehand_test]
async fn restart_and_retry_hands_the_message_to_a_new_incarnation() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::new(AtomicUsize::new(0)), Arc::default());
    let boss = stage.actor("boss", overseer(Some(Recovery::RestartAndRetry), &failures))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    worker.tell(Boom(String::from("boom")))?;
    worker.tell(Note::new("a"))?;

    assert!(eventually(|| trail.lock().len() == 3).await);
    assert_eq!(*trail.lock(), vec!["boom", "boom", "a"]);
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    stage.shutdown().await?;
    Ok(())
}

/// `Dismiss` ends the worker and bounces what it held back.
#[stagehand_test]
async fn dismiss_ends_the_worker() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::default(), Arc::default());
    let inbox = Inbox::default();
    let client = stage.actor("client", recorder(&inbox))?;
    let boss = stage.actor("boss", overseer(Some(Recovery::Dismiss), &failures))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.add_observer(&client);
    worker.supervise(&boss)?;

    with_receipt(&worker, Boom(String::from("boom")), &client)?;

    assert!(eventually(|| !recorded::<DeadLetter>(&inbox).is_empty()).await);
    assert_eq!(worker.state(), State::Dismissed);
    assert!(eventually(|| stage.get("worker").is_none()).await);
    assert!(recorded::<Bounced>(&inbox)
        .iter()
        .any(|bounced| matches!(bounced.reason, BounceReason::Failed(_))));
    assert!(worker.tell(Note::new("late")).is_err());
    stage.shutdown().await?;
    Ok(())
}

/// Without a supervisor a failure dismisses the actor as usual.
#[stagehand_test]
async fn unsupervised_failures_dismiss() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts) = (Trail::default(), Arc::default());
    let inbox = Inbox::default();
    let client = stage.actor("client", recorder(&inbox))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.add_observer(&client);

    worker.tell(Boom(String::from("boom")))?;

    assert!(eventually(|| !recorded::<DeadLetter>(&inbox).is_empty()).await);
    let letters = recorded::<DeadLetter>(&inbox);
    assert_eq!(letters[0].actor_id, "worker");
    assert!(letters[0].cause.as_deref().is_some_and(|cause| cause.contains("went off")));
    stage.shutdown().await?;
    Ok(())
}

/// A failure the supervisor can no longer hear about is not swallowed.
#[stagehand_test]
async fn a_departed_supervisor_lets_the_failure_through() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::default(), Arc::new(AtomicUsize::new(0)));

    // The supervisor is gone before the failure happens.
    let boss = stage.actor("boss", overseer(Some(Recovery::Retry), &failures))?;
    let orphan = stage.actor("orphan", fragile(&trail, &starts))?;
    orphan.supervise(&boss)?;
    orphan.tell(Note::new("registered"))?;
    assert!(eventually(|| trail.lock().len() == 1).await);
    boss.dismiss()?;
    assert!(eventually(|| stage.get("boss").is_none()).await);
    orphan.tell(Boom(String::from("boom")))?;
    assert!(eventually(|| orphan.state() == State::Dismissed).await);

    // The supervisor withdraws while the failure waits for an answer.
    let silent = stage.actor("silent", overseer(None, &failures))?;
    let (trail, starts) = (Trail::default(), Arc::default());
    let abandoned = stage.actor("abandoned", fragile(&trail, &starts))?;
    abandoned.supervise(&silent)?;
    abandoned.tell(Boom(String::from("boom")))?;
    assert!(eventually(|| failures.load(Ordering::SeqCst) == 1).await);
    assert_eq!(abandoned.state(), State::Started);
    abandoned.unsupervise()?;
    assert!(eventually(|| abandoned.state() == State::Dismissed).await);

    stage.shutdown().await?;
    Ok(())
}

/// Answers from anyone but the supervisor are refused.
#[stagehand_test]
async fn recoveries_from_strangers_bounce() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts, failures) = (Trail::default(), Arc::default(), Arc::default());
    let inbox = Inbox::default();
    let stranger = stage.actor("stranger", recorder(&inbox))?;
    let boss = stage.actor("boss", overseer(None, &failures))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;
    worker.tell(Boom(String::from("boom")))?;
    assert!(eventually(|| failures.load(Ordering::SeqCst) == 1).await);

    let forged = SupervisedRecovery {
        failure_id: uuid::Uuid::new_v4(),
        recovery: Recovery::Resume,
    };
    with_receipt(&worker, forged, &stranger)?;

    assert!(eventually(|| !recorded::<Bounced>(&inbox).is_empty()).await);
    assert!(matches!(recorded::<Bounced>(&inbox)[0].reason, BounceReason::Rejected(_)));
    assert_eq!(worker.state(), State::Started);
    stage.shutdown().await?;
    Ok(())
}

/// Answers `failure` as if `boss` had decided.
fn answer(worker: &Actor, boss: &Actor, failure: &SupervisedFailure, recovery: Recovery) -> anyhow::Result<()> {
    let decision = SupervisedRecovery {
        failure_id: failure.failure_id,
        recovery,
    };
    worker.tell_with(Message::new(decision), Headers::new(), Some(boss.clone()))?;
    Ok(())
}

/// Fails `worker` with a receipted [`Boom`] and waits until `desk` hears of it.
async fn fail_and_report(worker: &Actor, client: &Actor, desk: &Inbox) -> anyhow::Result<SupervisedFailure> {
    with_receipt(worker, Boom(String::from("boom")), client)?;
    assert!(eventually(|| !recorded::<SupervisedFailure>(desk).is_empty()).await);
    Ok(recorded::<SupervisedFailure>(desk).remove(0))
}

fn bounced_notes(inbox: &Inbox) -> Vec<(String, BounceReason)> {
    recorded::<Bounced>(inbox)
        .into_iter()
        .filter_map(|bounced| {
            let Note(text) = bounced.message.downcast_ref::<Note>()?.clone();
            Some((text, bounced.reason))
        })
        .collect()
}

/// `Restart` gives up on the failed message and the backlog, then restarts.
#[stagehand_test]
async fn restart_discards_everything_held_back() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts) = (Trail::default(), Arc::new(AtomicUsize::new(0)));
    let (inbox, desk) = (Inbox::default(), Inbox::default());
    let client = stage.actor("client", recorder(&inbox))?;
    let boss = stage.actor("boss", recorder(&desk))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    let failure = fail_and_report(&worker, &client, &desk).await?;
    assert_eq!(failure.actor_id, "worker");
    with_receipt(&worker, Note::new("held-1"), &client)?;
    with_receipt(&worker, Note::new("held-2"), &client)?;
    answer(&worker, &boss, &failure, Recovery::Restart)?;

    assert!(eventually(|| recorded::<Bounced>(&inbox).len() == 3).await);
    assert!(eventually(|| starts.load(Ordering::SeqCst) == 2).await);
    let failed: Vec<Bounced> = recorded::<Bounced>(&inbox)
        .into_iter()
        .filter(|bounced| bounced.message.is::<Boom>())
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(&failed[0].reason, BounceReason::Failed(cause) if cause.contains("went off")));
    let notes = bounced_notes(&inbox);
    assert_eq!(
        notes.iter().map(|(text, _)| text.as_str()).collect::<Vec<_>>(),
        vec!["held-1", "held-2"]
    );
    assert!(notes
        .iter()
        .all(|(_, reason)| matches!(reason, BounceReason::Rejected(why) if why.contains("Restart"))));
    assert!(recorded::<Receipt>(&inbox).is_empty());

    worker.tell(Note::new("fresh"))?;
    assert!(eventually(|| trail.lock().len() == 2).await);
    assert_eq!(*trail.lock(), vec!["boom", "fresh"]);
    assert_eq!(worker.state(), State::Started);
    stage.shutdown().await?;
    Ok(())
}

/// `RestartAndResume` bounces the failed message and hands the backlog to a new incarnation.
#[stagehand_test]
async fn restart_and_resume_delivers_the_backlog_after_restarting() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts) = (Trail::default(), Arc::new(AtomicUsize::new(0)));
    let (inbox, desk) = (Inbox::default(), Inbox::default());
    let client = stage.actor("client", recorder(&inbox))?;
    let boss = stage.actor("boss", recorder(&desk))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    let failure = fail_and_report(&worker, &client, &desk).await?;
    with_receipt(&worker, Note::new("held-1"), &client)?;
    with_receipt(&worker, Note::new("held-2"), &client)?;
    answer(&worker, &boss, &failure, Recovery::RestartAndResume)?;

    assert!(eventually(|| recorded::<Receipt>(&inbox).len() == 2).await);
    assert_eq!(*trail.lock(), vec!["boom", "held-1", "held-2"]);
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    let bounced = recorded::<Bounced>(&inbox);
    assert_eq!(bounced.len(), 1);
    assert_eq!(bounced[0].message.downcast_ref::<Boom>(), Some(&Boom(String::from("boom"))));
    assert!(matches!(bounced[0].reason, BounceReason::Failed(_)));
    assert_eq!(worker.state(), State::Started);
    stage.shutdown().await?;
    Ok(())
}

/// Stopping while a failure waits for its recovery bounces everything held back.
#[stagehand_test]
async fn stopping_with_a_pending_failure_bounces_the_backlog() -> anyhow::Result<()> {
    initialize_tracing();
    let stage = stage_with(instant_restarts());
    let (trail, starts) = (Trail::default(), Arc::default());
    let (inbox, desk) = (Inbox::default(), Inbox::default());
    let client = stage.actor("client", recorder(&inbox))?;
    let boss = stage.actor("boss", recorder(&desk))?;
    let worker = stage.actor("worker", fragile(&trail, &starts))?;
    worker.supervise(&boss)?;

    fail_and_report(&worker, &client, &desk).await?;
    with_receipt(&worker, Note::new("held-1"), &client)?;
    with_receipt(&worker, Note::new("held-2"), &client)?;
    assert!(eventually(|| worker.queued() == 0).await);
    worker.stop()?;

    assert!(eventually(|| recorded::<Bounced>(&inbox).len() == 3).await);
    assert_eq!(*trail.lock(), vec!["boom"]);
    assert!(recorded::<Bounced>(&inbox)
        .iter()
        .any(|bounced| bounced.message.is::<Boom>() && matches!(bounced.reason, BounceReason::Failed(_))));
    let mut notes = bounced_notes(&inbox);
    notes.sort_by(|left, right| left.0.cmp(&right.0));
    assert_eq!(
        notes,
        vec![
            (String::from("held-1"), BounceReason::Stopped),
            (String::from("held-2"), BounceReason::Stopped),
        ]
    );
    assert!(recorded::<Receipt>(&inbox).is_empty());
    assert_eq!(worker.state(), State::Stopped);
    stage.shutdown().await?;
    Ok(())
}
