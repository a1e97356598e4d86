use figport::application::error::AppError;
use figport::config::{ProjectsArgs, Settings};

use super::{client, print_json};

pub async fn run(settings: &Settings, args: ProjectsArgs) -> Result<(), AppError> {
    let projects = client(settings)?.team_projects(&args.team_id).await?;
    print_json(&projects)
}
