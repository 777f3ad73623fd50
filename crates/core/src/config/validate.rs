use super::{types::Config, ConfigError, CursorBackend, JobConfig};

/// Validate configuration
/// Currently validates:
/// - Job section exists (enforced by serde)
/// - Batch size is not 0 and fits an SQLite integer
/// - Job-specific limits are positive
/// - Merge target differs from the source
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.ingest.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "ingest.batch_size cannot be 0".to_string(),
        ));
    }

    if i64::try_from(config.ingest.batch_size).is_err() {
        return Err(ConfigError::ValidationError(format!(
            "ingest.batch_size cannot exceed {}",
            i64::MAX
        )));
    }

    if config.ingest.max_rows == Some(0) {
        return Err(ConfigError::ValidationError(
            "ingest.max_rows cannot be 0".to_string(),
        ));
    }

    if config.cursor.backend != CursorBackend::Memory && config.cursor.path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "cursor.path cannot be empty".to_string(),
        ));
    }

    match &config.job {
        JobConfig::Merge(merge) => {
            if merge.target == config.source.path {
                return Err(ConfigError::ValidationError(
                    "job.target cannot be the same database as source.path".to_string(),
                ));
            }
        }
        JobConfig::Tags(tags) => {
            if tags.max_tags_per_infohash == 0 {
                return Err(ConfigError::ValidationError(
                    "job.max_tags_per_infohash cannot be 0".to_string(),
                ));
            }
            if tags.creator_pool == 0 {
                return Err(ConfigError::ValidationError(
                    "job.creator_pool cannot be 0".to_string(),
                ));
            }
        }
        JobConfig::Survey(_) => {}
        JobConfig::Group(group) => {
            if group.query.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "job.query cannot be empty".to_string(),
                ));
            }
        }
    }

    Ok(())
}
