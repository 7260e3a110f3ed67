use anyhow::{bail, Context};
use tracing::{info, warn};

use dataset_query::card::Card;
use dataset_query::config::{init_logging, Settings};
use dataset_query::metadata::Metadata;
use dataset_query::query::DatasetQuery;

/// dq <metadata.json> <card-or-dataset-query.json>
///
/// Decodes the dataset query, checks every filter against the metadata and prints the query
/// re-encoded in wire form.
fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env();
    init_logging(&settings);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [metadata_path, query_path] = args.as_slice() else {
        bail!("usage: dq <metadata.json> <card-or-dataset-query.json>");
    };

    let metadata: Metadata = serde_json::from_str(&std::fs::read_to_string(metadata_path).with_context(|| format!("reading {}", metadata_path))?)
        .with_context(|| format!("parsing metadata {}", metadata_path))?;
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(query_path).with_context(|| format!("reading {}", query_path))?)
        .with_context(|| format!("parsing {}", query_path))?;

    // accept either a whole card or a bare dataset_query
    let query = if raw.get("dataset_query").is_some() {
        serde_json::from_value::<Card>(raw)?.dataset_query
    } else {
        DatasetQuery::from_json(&raw)?
    };
    info!(target: "dq", "loaded {} query database={:?}", if query.is_structured() { "structured" } else { "native" }, query.database());

    if let Some(q) = query.as_structured() {
        q.query.validate(&metadata)?;
        for (slot, filter) in q.query.slots().zip(q.query.filters()) {
            let dim = filter.dimension(&metadata)?;
            if filter.is_complete() {
                info!(target: "dq", "filter {} on '{}' ({}) complete", slot, dim.display_name(), filter.operator().as_str());
            } else {
                warn!(target: "dq", "filter {} on '{}' ({}) has unset arguments", slot, dim.display_name(), filter.operator().as_str());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&query.to_json())?);
    Ok(())
}
