//! Knowledge unit commands - get, delete and list

use anyhow::bail;

use super::Session;

pub async fn get(session: &Session, id: &str) -> anyhow::Result<()> {
    let unit = session.units.get_required(id).await?;
    println!("{}", serde_json::to_string_pretty(&unit)?);
    Ok(())
}

pub async fn delete(session: &Session, id: &str) -> anyhow::Result<()> {
    if !session.units.delete(id).await? {
        bail!("Knowledge unit '{}' not found", id);
    }
    println!("Deleted knowledge unit '{}'", id);
    Ok(())
}

pub async fn list(session: &Session, domain: &str) -> anyhow::Result<()> {
    let units = session.units.find_by_domain(domain).await?;
    println!("{}", serde_json::to_string_pretty(&units)?);
    Ok(())
}
