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


use std::mem;
use std::sync::atomic::Ordering;

use tracing::{debug, error, trace, warn};

use crate::actor::{guarded, Actor, ActorError, Agent, Effects, State, Transition};
use crate::executor::{ExecutorError, Task};
use crate::message::{BounceReason, Bounced, DeadLetter, Delivery, Envelop, Headers, Message, Receipt};
use crate::traits::Behavior;

const LIVE: [State; 5] = [
    State::Created,
    State::Starting,
    State::Started,
    State::Restarting,
    State::Stopped,
];

impl Actor {
    /// Accepts a delivery into the mailbox, or refuses it up front.
    pub(crate) fn post(&self, delivery: Delivery) -> Result<(), ActorError> {
        let state = self.state();
        if state.is_terminal() {
            self.bounce(&delivery.message, &delivery.envelop, refusal(state));
            return Err(self.illegal(state, "receive messages"));
        }
        let cell = &self.cell;
        if cell.inbox.fetch_add(1, Ordering::SeqCst) >= cell.quota {
            self.settle();
            self.bounce(&delivery.message, &delivery.envelop, BounceReason::QuotaExceeded);
            return Err(ActorError::QuotaExceeded {
                id: cell.id.clone(),
                quota: cell.quota,
            });
        }
        let returned = delivery.envelop.receipt_id().map(|_| delivery.redeliver());
        let actor = self.clone();
        cell.mailbox
            .execute(Box::new(move || actor.receive(delivery)))
            .map_err(|source| {
                self.settle();
                if let Some(returned) = returned {
                    self.bounce(&returned.message, &returned.envelop, BounceReason::Rejected(source.to_string()));
                }
                self.rejected(source)
            })
    }

    /// First step of every delivery, on the mailbox.
    fn receive(&self, delivery: Delivery) {
        delivery.envelop.mark_received();
        let mut core = self.cell.core.lock();
        match core.state {
            state if state.buffers_messages() => {
                trace!(actor = %self.id(), %state, "delaying message");
                core.delayed.push_back(delivery);
            }
            State::Started if !core.delayed.is_empty() => {
                core.delayed.push_back(delivery);
                drop(core);
                self.schedule_replay();
            }
            State::Started => {
                drop(core);
                self.dispatch(delivery);
            }
            state => {
                drop(core);
                self.settle();
                self.bounce(&delivery.message, &delivery.envelop, refusal(state));
            }
        }
    }

    /// Runs the behavior on one delivery.
    fn dispatch(&self, delivery: Delivery) {
        self.settle();
        let taken = self.cell.core.lock().behavior.take();
        let Some(mut behavior) = taken else {
            warn!(actor = %self.id(), "no behavior installed, message dropped");
            self.bounce(
                &delivery.message,
                &delivery.envelop,
                BounceReason::Rejected(String::from("no behavior installed")),
            );
            return;
        };
        let _entered = self.cell.span.enter();
        trace!(message = ?delivery.message, "dispatching");
        let mut agent = Agent::new(self);
        let outcome = guarded(|| behavior.on_message(&delivery.message, &delivery.envelop, &mut agent));
        let effects = agent.into_effects();
        match outcome {
            Ok(()) => {
                if delivery.envelop.wants_receipt() {
                    self.send_receipt(&delivery.envelop);
                }
                self.reinstall(behavior, effects);
            }
            Err(cause) => {
                error!(message = ?delivery.message, "message handling failed: {cause:#}");
                if delivery.envelop.wants_receipt() {
                    self.bounce(&delivery.message, &delivery.envelop, BounceReason::Failed(format!("{cause:#}")));
                }
                self.reinstall(behavior, Effects::default());
                self.fail(&cause);
            }
        }
    }

    /// Puts the behavior back after a callback and applies what it asked for.
    fn reinstall(&self, behavior: Box<dyn Behavior>, effects: Effects) {
        let Effects {
            replacement,
            transition,
            redeliveries,
        } = effects;
        {
            let mut core = self.cell.core.lock();
            core.behavior = Some(replacement.unwrap_or(behavior));
            self.cell.inbox.fetch_add(redeliveries.len(), Ordering::SeqCst);
            for delivery in redeliveries.into_iter().rev() {
                core.delayed.push_front(delivery);
            }
        }
        if let Some(transition) = transition {
            let applied = match transition {
                Transition::Restart => self.restart(),
                Transition::Stop => self.stop(),
                Transition::Dismiss => self.dismiss(),
            };
            if let Err(refused) = applied {
                warn!(actor = %self.id(), "{refused}");
            }
        }
        self.schedule_replay();
    }

    /// Queues the replay of the next delayed message, once.
    fn schedule_replay(&self) {
        {
            let mut core = self.cell.core.lock();
            if core.replaying || core.state != State::Started || core.delayed.is_empty() {
                return;
            }
            core.replaying = true;
        }
        let actor = self.clone();
        if let Err(source) = self.cell.mailbox.execute_next(Box::new(move || actor.replay_one())) {
            self.cell.core.lock().replaying = false;
            warn!(actor = %self.id(), "could not replay delayed messages: {source}");
        }
    }

    fn replay_one(&self) {
        let next = {
            let mut core = self.cell.core.lock();
            core.replaying = false;
            if core.state != State::Started {
                return;
            }
            core.delayed.pop_front()
        };
        if let Some(delivery) = next {
            self.dispatch(delivery);
        }
        self.schedule_replay();
    }

    /// Acquires a behavior from the role and starts it.
    pub(crate) fn begin(&self) {
        if !matches!(self.state(), State::Starting | State::Restarting) {
            return;
        }
        let _entered = self.cell.span.enter();
        let mut behavior = match guarded(|| self.cell.role.behavior(self.id())) {
            Ok(behavior) => behavior,
            Err(cause) => {
                error!("could not create behavior: {cause:#}");
                self.fail(&cause);
                return;
            }
        };
        let mut agent = Agent::new(self);
        let started = guarded(|| behavior.on_start(&mut agent));
        let effects = agent.into_effects();
        if let Err(cause) = started {
            error!("start failed: {cause:#}");
            self.fail(&cause);
            return;
        }
        {
            let mut core = self.cell.core.lock();
            if matches!(core.state, State::Starting | State::Restarting) {
                core.state = State::Started;
            }
        }
        debug!("started");
        self.reinstall(behavior, effects);
    }

    /// Stops the old behavior, then starts a new one unless restarts ran out.
    pub(crate) fn recycle(&self) {
        let old = {
            let mut core = self.cell.core.lock();
            if core.state != State::Restarting {
                return;
            }
            core.behavior.take()
        };
        if let Some(mut old) = old {
            self.run_stop(&mut old);
        }
        let verdict = {
            let mut limiter = self.cell.restarts.lock();
            limiter.can_restart().map(|()| limiter.record_restart())
        };
        match verdict {
            Err(exceeded) => {
                error!(actor = %self.id(), "{exceeded}");
                self.abandon(exceeded.to_string());
            }
            Ok(backoff) if backoff.is_zero() => self.begin(),
            Ok(backoff) => {
                debug!(actor = %self.id(), ?backoff, "restart delayed");
                let actor = self.clone();
                let wakeup = self.cell.scheduler.schedule(backoff, move || {
                    let next = actor.clone();
                    if let Err(source) = actor.cell.mailbox.execute_next(Box::new(move || next.begin())) {
                        warn!(actor = %actor.id(), "restart abandoned: {source}");
                    }
                });
                if wakeup.is_done() {
                    self.abandon(String::from("scheduler refused the restart"));
                }
            }
        }
    }

    /// Runs `on_stop` after [`stop`](Actor::stop) and refuses what was delayed.
    pub(crate) fn wind_down(&self) {
        let (behavior, delayed) = {
            let mut core = self.cell.core.lock();
            if core.state != State::Stopped {
                return;
            }
            (core.behavior.take(), mem::take(&mut core.delayed))
        };
        if let Some(mut behavior) = behavior {
            self.run_stop(&mut behavior);
        }
        self.refuse_all(delayed, &BounceReason::Stopped);
        debug!(actor = %self.id(), "stopped");
    }

    pub(crate) fn dismiss_with(&self, cause: Option<String>) -> Result<(), ActorError> {
        self.transition(&LIVE, State::Dismissed, "dismiss")?;
        let actor = self.clone();
        let deferred = cause.clone();
        if let Err(source) = self
            .cell
            .mailbox
            .execute_next(Box::new(move || actor.finalize(deferred)))
        {
            warn!(actor = %self.id(), "mailbox refused the dismissal, finishing inline: {source}");
            self.finalize(cause);
        }
        Ok(())
    }

    /// Last task of every actor; runs once.
    fn finalize(&self, cause: Option<String>) {
        let (behavior, delayed, observers) = {
            let mut core = self.cell.core.lock();
            if core.finalized {
                return;
            }
            core.finalized = true;
            core.replaying = false;
            core.cause.clone_from(&cause);
            (core.behavior.take(), mem::take(&mut core.delayed), mem::take(&mut core.observers))
        };
        if let Some(mut behavior) = behavior {
            self.run_stop(&mut behavior);
        }
        self.refuse_all(delayed, &BounceReason::Dismissed);
        let letter = Message::new(DeadLetter {
            actor_id: self.id().to_string(),
            cause,
        });
        for observer in &observers {
            self.notify(observer, letter.clone());
        }
        self.unregister();
        debug!(actor = %self.id(), "dismissed");
    }

    fn fail(&self, cause: &anyhow::Error) {
        self.abandon(format!("{cause:#}"));
    }

    fn abandon(&self, cause: String) {
        if let Err(refused) = self.dismiss_with(Some(cause)) {
            trace!(actor = %self.id(), "{refused}");
        }
    }

    fn run_stop(&self, behavior: &mut dyn Behavior) {
        let _entered = self.cell.span.enter();
        let mut agent = Agent::new(self);
        if let Err(cause) = guarded(|| behavior.on_stop(&mut agent)) {
            warn!("on_stop failed: {cause:#}");
        }
    }

    fn refuse_all(&self, deliveries: impl IntoIterator<Item = Delivery>, reason: &BounceReason) {
        for delivery in deliveries {
            self.settle();
            self.bounce(&delivery.message, &delivery.envelop, reason.clone());
        }
    }

    /// Moves from one of `from` to `to`, returning the previous state.
    pub(crate) fn transition(&self, from: &[State], to: State, operation: &'static str) -> Result<State, ActorError> {
        let mut core = self.cell.core.lock();
        let state = core.state;
        if !from.contains(&state) {
            return Err(self.illegal(state, operation));
        }
        core.state = to;
        drop(core);
        debug!(actor = %self.id(), from = %state, to = %to, "transition");
        Ok(state)
    }

    /// Queues a lifecycle task ahead of waiting messages.
    ///
    /// An executor that refuses lifecycle work leaves the actor unusable, so
    /// it is finalized on the spot.
    pub(crate) fn queue_head(&self, task: Task) -> Result<(), ActorError> {
        self.cell.mailbox.execute_next(task).map_err(|source| {
            self.cell.core.lock().state = State::Dismissed;
            self.finalize(Some(source.to_string()));
            self.rejected(source)
        })
    }

    pub(crate) fn unregister(&self) {
        if let Some(stage) = self.cell.stage.upgrade() {
            stage.unregister(self);
        }
    }

    pub(crate) fn illegal(&self, state: State, operation: &'static str) -> ActorError {
        ActorError::IllegalState {
            id: self.id().to_string(),
            state,
            operation,
        }
    }

    pub(crate) fn rejected(&self, source: ExecutorError) -> ActorError {
        ActorError::Rejected {
            id: self.id().to_string(),
            source,
        }
    }

    fn settle(&self) {
        let _ = self
            .cell
            .inbox
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1));
    }

    /// Tells the sender a [`Bounced`] if it asked for a receipt.
    pub(crate) fn bounce(&self, message: &Message, envelop: &Envelop, reason: BounceReason) {
        let (Some(receipt_id), Some(sender)) = (envelop.receipt_id(), envelop.sender()) else {
            return;
        };
        trace!(actor = %self.id(), %reason, "bouncing");
        let bounced = Bounced {
            receipt_id,
            message: message.clone(),
            reason,
        };
        self.notify(sender, Message::new(bounced));
    }

    fn send_receipt(&self, envelop: &Envelop) {
        let (Some(receipt_id), Some(sender)) = (envelop.receipt_id(), envelop.sender()) else {
            return;
        };
        let receipt = Receipt {
            receipt_id,
            actor_id: self.id().to_string(),
        };
        self.notify(sender, Message::new(receipt));
    }

    /// Best-effort notification from this actor.
    pub(crate) fn notify(&self, target: &Actor, message: Message) {
        if let Err(refused) = target.tell_with(message, Headers::new(), Some(self.clone())) {
            warn!(actor = %self.id(), to = %target.id(), "notification lost: {refused}");
        }
    }
}

const fn refusal(state: State) -> BounceReason {
    match state {
        State::Stopped => BounceReason::Stopped,
        _ => BounceReason::Dismissed,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::runtime::Handle;

    use super::*;
    use crate::actor::RestartLimiterConfig;
    use crate::behavior::BehaviorBuilder;
    use crate::common::{Stage, StageConfig};
    use crate::executor::tests::ManualQueue;
    use crate::executor::ExecutorRef;
    use crate::traits::{Role, Script};

    type Seen = Arc<Mutex<Vec<u32>>>;
    type Inbox = Arc<Mutex<Vec<Message>>>;

    fn stage_with(restart: RestartLimiterConfig) -> (Stage, Arc<ManualQueue>) {
        let config = StageConfig {
            restart,
            ..StageConfig::default()
        };
        (Stage::with_config(Handle::current(), config), Arc::new(ManualQueue::default()))
    }

    /// Records every `u32`; zero fails, `99` restarts, `100` swaps in a doubling behavior.
    fn counting(queue: &Arc<ManualQueue>, seen: &Seen) -> Script<impl Fn(&str) -> anyhow::Result<Box<dyn Behavior>> + Send + Sync> {
        let seen = Arc::clone(seen);
        Script::new(move |_: &str| counter(&seen)).with_executor(Arc::clone(queue) as ExecutorRef)
    }

    fn counter(seen: &Seen) -> anyhow::Result<Box<dyn Behavior>> {
        let seen = Arc::clone(seen);
        let doubled = Arc::clone(&seen);
        Ok(BehaviorBuilder::new()
            .on_message::<u32, _>(move |n, _, agent| {
                match *n {
                    0 => anyhow::bail!("zero is not a count"),
                    99 => agent.restart(),
                    100 => {
                        let doubled = Arc::clone(&doubled);
                        agent.set_behavior(
                            BehaviorBuilder::new()
                                .on_message::<u32, _>(move |n, _, _| {
                                    doubled.lock().push(n * 2);
                                    Ok(())
                                })
                                .build()?,
                        );
                    }
                    _ => {}
                }
                seen.lock().push(*n);
                Ok(())
            })
            .build()?)
    }

    fn probe(queue: &Arc<ManualQueue>, inbox: &Inbox) -> impl Role {
        let inbox = Arc::clone(inbox);
        Script::new(move |_: &str| {
            let inbox = Arc::clone(&inbox);
            Ok(BehaviorBuilder::new()
                .on_any(move |message, _, _| {
                    inbox.lock().push(message.clone());
                    Ok(())
                })
                .build()?)
        })
        .with_executor(Arc::clone(queue) as ExecutorRef)
    }

    fn bounces(inbox: &Inbox) -> Vec<BounceReason> {
        inbox
            .lock()
            .iter()
            .filter_map(|message| message.downcast_ref::<Bounced>())
            .map(|bounced| bounced.reason.clone())
            .collect()
    }

    #[tokio::test]
    async fn messages_told_before_start_wait_for_it() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let actor = stage.create("early", counting(&queue, &seen)).unwrap();
        for n in 1..=3_u32 {
            actor.tell(n).unwrap();
        }
        queue.run_all();
        assert!(seen.lock().is_empty());
        assert_eq!(actor.unprocessed(), 3);

        actor.start().unwrap();
        assert_eq!(actor.state(), State::Starting);
        queue.run_all();
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(actor.state(), State::Started);
        assert_eq!(actor.unprocessed(), 0);
    }

    #[tokio::test]
    async fn messages_during_a_restart_backoff_are_replayed_in_order() {
        let (stage, queue) = stage_with(RestartLimiterConfig {
            initial_backoff_ms: 20,
            ..RestartLimiterConfig::default()
        });
        let seen = Seen::default();
        let actor = stage.actor("phoenix", counting(&queue, &seen)).unwrap();
        actor.tell(1_u32).unwrap();
        queue.run_all();

        actor.restart().unwrap();
        actor.tell(2_u32).unwrap();
        actor.tell(3_u32).unwrap();
        queue.run_all();
        assert_eq!(actor.state(), State::Restarting);
        assert_eq!(*seen.lock(), vec![1]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        queue.run_all();
        assert_eq!(actor.state(), State::Started);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exhausted_restarts_dismiss_the_actor() {
        let (stage, queue) = stage_with(RestartLimiterConfig {
            max_restarts: 1,
            initial_backoff_ms: 0,
            ..RestartLimiterConfig::default()
        });
        let seen = Seen::default();
        let inbox = Inbox::default();
        let actor = stage.actor("fragile", counting(&queue, &seen)).unwrap();
        let watcher = stage.actor("watcher", probe(&queue, &inbox)).unwrap();
        actor.add_observer(&watcher);
        queue.run_all();

        actor.tell(99_u32).unwrap();
        queue.run_all();
        assert_eq!(actor.state(), State::Started);
        actor.tell(99_u32).unwrap();
        queue.run_all();

        assert_eq!(actor.state(), State::Dismissed);
        assert!(stage.get("fragile").is_none());
        let letters: Vec<DeadLetter> = inbox
            .lock()
            .iter()
            .filter_map(|message| message.downcast_ref::<DeadLetter>().cloned())
            .collect();
        assert_eq!(letters.len(), 1);
        assert!(letters[0].cause.as_deref().unwrap_or_default().contains("restart limit exceeded"));
    }

    #[tokio::test]
    async fn a_failing_message_dismisses_and_later_ones_bounce() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let inbox = Inbox::default();
        let actor = stage.actor("brittle", counting(&queue, &seen)).unwrap();
        let sender = stage.actor("sender", probe(&queue, &inbox)).unwrap();
        for n in [1_u32, 0, 3] {
            actor
                .tell_with(Message::new(n), Headers::new().with_receipt(), Some(sender.clone()))
                .unwrap();
        }
        queue.run_all();

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(actor.state(), State::Dismissed);
        let reasons = bounces(&inbox);
        assert_eq!(reasons.len(), 2);
        assert!(matches!(&reasons[0], BounceReason::Failed(cause) if cause.contains("zero")));
        assert_eq!(reasons[1], BounceReason::Dismissed);
        assert_eq!(inbox.lock().iter().filter(|message| message.is::<Receipt>()).count(), 1);

        let refused = actor.tell(4_u32).unwrap_err();
        assert!(matches!(refused, ActorError::IllegalState { state: State::Dismissed, .. }));
    }

    #[tokio::test]
    async fn stopped_actors_refuse_messages() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let stops = Arc::new(Mutex::new(0_u32));
        let counted = Arc::clone(&stops);
        let role = Script::new(move |_: &str| {
            let counted = Arc::clone(&counted);
            Ok(BehaviorBuilder::new()
                .on_stop(move |_| {
                    *counted.lock() += 1;
                    Ok(())
                })
                .build()?)
        })
        .with_executor(Arc::clone(&queue) as ExecutorRef);
        let actor = stage.actor("quiet", role).unwrap();
        queue.run_all();
        actor.stop().unwrap();
        queue.run_all();

        assert_eq!(*stops.lock(), 1);
        assert!(matches!(
            actor.tell(1_u32),
            Err(ActorError::IllegalState { state: State::Stopped, .. })
        ));
        assert!(actor.stop().is_err());
        actor.dismiss().unwrap();
        queue.run_all();
        assert_eq!(*stops.lock(), 1);
        assert!(actor.dismiss().is_err());
    }

    #[tokio::test]
    async fn lazy_dismissal_lets_waiting_messages_through() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let actor = stage.actor("patient", counting(&queue, &seen)).unwrap();
        queue.run_all();
        actor.tell(1_u32).unwrap();
        actor.tell(2_u32).unwrap();
        actor.dismiss_lazy().unwrap();
        actor.tell(3_u32).unwrap();
        queue.run_all();
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(actor.state(), State::Dismissed);
    }

    #[tokio::test]
    async fn inbox_quota_refuses_excess_messages() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let inbox = Inbox::default();
        let actor = stage.create("narrow", counting(&queue, &seen).with_quota(2)).unwrap();
        let sender = stage.actor("sender", probe(&queue, &inbox)).unwrap();
        actor.tell(1_u32).unwrap();
        actor.tell(2_u32).unwrap();
        let refused = actor
            .tell_with(Message::new(3_u32), Headers::new().with_receipt(), Some(sender))
            .unwrap_err();
        assert_eq!(
            refused,
            ActorError::QuotaExceeded {
                id: String::from("narrow"),
                quota: 2
            }
        );
        actor.start().unwrap();
        queue.run_all();
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(bounces(&inbox), vec![BounceReason::QuotaExceeded]);
        actor.tell(3_u32).unwrap();
    }

    #[tokio::test]
    async fn a_replacement_behavior_handles_the_next_message() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let actor = stage.actor("shifty", counting(&queue, &seen)).unwrap();
        actor.tell(100_u32).unwrap();
        actor.tell(5_u32).unwrap();
        queue.run_all();
        assert_eq!(*seen.lock(), vec![100, 10]);
    }

    #[tokio::test]
    async fn lifecycle_operations_check_the_state() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let actor = stage.create("strict", counting(&queue, &seen)).unwrap();
        assert!(matches!(
            actor.restart(),
            Err(ActorError::IllegalState { operation: "restart", state: State::Created, .. })
        ));
        assert!(actor.stop().is_err());
        actor.start().unwrap();
        assert!(actor.start().is_err());
        queue.run_all();
        actor.remove().unwrap();
        assert!(stage.get("strict").is_none());
        queue.run_all();
        assert_eq!(actor.state(), State::Dismissed);
    }

    #[tokio::test]
    async fn every_observer_hears_of_the_dismissal_once() {
        let (stage, queue) = stage_with(RestartLimiterConfig::disabled());
        let seen = Seen::default();
        let inbox = Inbox::default();
        let actor = stage.actor("doomed", counting(&queue, &seen)).unwrap();
        let watchers: Vec<Actor> = (0..32)
            .map(|n| stage.actor(&format!("watcher-{n}"), probe(&queue, &inbox)).unwrap())
            .collect();
        queue.run_all();

        actor.tell(0_u32).unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| queue.run_all());
            for watcher in &watchers {
                actor.add_observer(watcher);
            }
        });
        queue.run_all();

        assert_eq!(actor.state(), State::Dismissed);
        let letters: Vec<DeadLetter> = inbox
            .lock()
            .iter()
            .filter_map(|message| message.downcast_ref::<DeadLetter>().cloned())
            .collect();
        assert_eq!(letters.len(), watchers.len());
        assert!(letters
            .iter()
            .all(|letter| letter.cause.as_deref().is_some_and(|cause| cause.contains("zero"))));
    }
}
