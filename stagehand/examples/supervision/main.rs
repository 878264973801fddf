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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stagehand::prelude::*;
use tokio::time::{sleep, Duration};

/// Work for the flaky worker; the first job named "explode" fails.
#[derive(Clone, Debug)]
struct Job(String);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Launch a stage on the current runtime, with configuration from disk.
    let stage = Stage::launch()?;

    // 2. The supervisor decides how failed actors recover. This one always retries.
    let supervisor = stage.actor(
        "supervisor",
        Script::new(|_: &str| {
            Ok(BehaviorBuilder::new()
                .on_message::<SupervisedFailure, _>(|failure, envelop, agent| {
                    println!("{} failed: {:#}, retrying", failure.actor_id, failure.cause);
                    agent.reply(
                        envelop,
                        SupervisedRecovery {
                            failure_id: failure.failure_id,
                            recovery: Recovery::Retry,
                        },
                    )?;
                    Ok(())
                })
                .build()?)
        }),
    )?;

    // 3. The worker fails once. Wrapping its role keeps the supervisor
    //    registered across restarts.
    let exploded = Arc::new(AtomicBool::new(false));
    let worker = stage.actor(
        "worker",
        SupervisedRole::new(Script::new(move |_: &str| {
            let exploded = Arc::clone(&exploded);
            Ok(BehaviorBuilder::new()
                .on_start(|agent| {
                    println!("{} is ready", agent.id());
                    Ok(())
                })
                .on_message::<Job, _>(move |Job(name), _, _| {
                    if name == "explode" && !exploded.swap(true, Ordering::SeqCst) {
                        anyhow::bail!("job {name} blew up");
                    }
                    println!("finished job {name}");
                    Ok(())
                })
                .build()?)
        })),
    )?;
    worker.supervise(&supervisor)?;

    // 4. Jobs sent after the failing one wait until the supervisor has answered.
    for name in ["warm-up", "explode", "cool-down"] {
        worker.tell(Job(name.to_string()))?;
    }

    sleep(Duration::from_millis(200)).await;

    // 5. Dismiss everything and wait for the executor to drain.
    stage.shutdown().await?;
    Ok(())
}
