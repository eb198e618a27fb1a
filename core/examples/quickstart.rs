//! Walk through the main operations against a running daemon.
//!
//! ```sh
//! HARNESS_MEM_BASE_URL=http://127.0.0.1:37888 cargo run -p harness-mem-core --example quickstart
//! ```

use harness_mem_core::{
    CheckpointRequest, FinalizeSessionRequest, GetObservationsRequest, HarnessMemClient,
    SearchRequest, SessionFinalizeItem, TimelineRequest,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), harness_mem_core::Error> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = HarnessMemClient::from_env();
    let session_id = format!("rust-quickstart-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let project = "rust-quickstart";

    let health = client.health()?;
    println!("health ok: {:?}", health.ok());

    let checkpoint = client.record_checkpoint(
        &CheckpointRequest::new(session_id.as_str(), "quickstart-checkpoint", "quickstart event from rust sdk")
            .platform("codex")
            .project(project)
            .tags(["quickstart"]),
    )?;
    println!("checkpoint ok: {:?}", checkpoint.ok());

    let search = client.search(
        &SearchRequest::new("quickstart event")
            .project(project)
            .limit(5)
            .include_private(true),
    )?;
    println!("search hits: {}", search.items().len());

    if let Some(observation_id) = search.first_id() {
        let timeline = client.timeline(
            &TimelineRequest::new(observation_id)
                .window(1, 1)
                .include_private(true),
        )?;
        println!("timeline items: {}", timeline.items().len());

        let details = client.get_observations(
            &GetObservationsRequest::new(observation_id)
                .include_private(true)
                .compact(false),
        )?;
        println!("details items: {}", details.items().len());
    }

    let finalized = client.finalize_session(
        &FinalizeSessionRequest::new(session_id.as_str())
            .platform("codex")
            .project(project),
    )?;
    let summary = finalized
        .items_as::<SessionFinalizeItem>()?
        .into_iter()
        .next()
        .and_then(|item| item.summary)
        .unwrap_or_default();
    let preview: String = summary.chars().take(80).collect();
    println!("finalize ok: {:?} summary preview: {preview}", finalized.ok());
    Ok(())
}
