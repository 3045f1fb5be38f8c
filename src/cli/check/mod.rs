//! Check command - verifies connectivity and reports collection sizes

use serde_json::json;
use tracing::info;

use super::{Session, backend_notice};

pub async fn run(session: &Session) -> anyhow::Result<()> {
    let units = session.units.count().await?;
    let integration_points = session.connection.integration_points().count().await?;

    info!(
        project_id = %session.connection.project_id(),
        units,
        integration_points,
        "Store connection healthy"
    );

    let report = json!({
        "project_id": session.connection.project_id(),
        "backend": session.config.store_backend,
        "persistent": backend_notice(&session.config).is_none(),
        "knowledge_units": units,
        "integration_points": integration_points,
        "max_knowledge_units": session.config.max_knowledge_units,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
