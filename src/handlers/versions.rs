use figport::application::error::AppError;
use figport::config::{Settings, VersionsArgs};

use super::{client, print_json};

pub async fn run(settings: &Settings, args: VersionsArgs) -> Result<(), AppError> {
    let versions = client(settings)?.file_versions(&args.key).await?;
    print_json(&versions)
}
