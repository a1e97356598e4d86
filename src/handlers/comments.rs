use figport::application::error::AppError;
use figport::config::{CommentsAddArgs, CommentsArgs, CommentsCommand, Settings};
use figport_api_types::Vector;

use super::{client, print_json};

pub async fn run(settings: &Settings, args: CommentsArgs) -> Result<(), AppError> {
    match args.command {
        CommentsCommand::List(list) => {
            let comments = client(settings)?.comments(&list.key).await?;
            print_json(&comments)
        }
        CommentsCommand::Add(add) => create(settings, add).await,
    }
}

async fn create(settings: &Settings, args: CommentsAddArgs) -> Result<(), AppError> {
    if args.message.trim().is_empty() {
        return Err(AppError::validation("comment message must not be empty"));
    }
    if !args.x.is_finite() || !args.y.is_finite() {
        return Err(AppError::validation("comment position must be finite"));
    }

    let position = Vector {
        x: args.x,
        y: args.y,
    };
    let comment = client(settings)?
        .add_comment(&args.key, &args.message, position)
        .await?;
    print_json(&comment)
}
