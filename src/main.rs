//! Command-line front end for the newsfeed client

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use cli::{Cli, Commands, KnowledgeCommands, SessionCommands, VideoCommands};
use newsfeed_client::agents::{PollConfig, PollingAgent};
use newsfeed_client::api::{ChatApi, FeedApi, KnowledgeApi, KnowledgeItem, KnowledgeQuery, VideoApi};
use newsfeed_client::{init_tracing, AuthClient, ClientConfig};

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::load();
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_string();
    }

    let client = AuthClient::from_config(config).context("Failed to build client")?;
    client
        .on_session_ended(|location| {
            eprintln!("Session expired. Sign in again ({location}): newsfeed signin <username> <password>");
        })
        .await;

    let chat = ChatApi::new(client.clone());

    match cli.command {
        Commands::Signin { username, password } => {
            let response = client.signin(&username, &password).await?;
            if response.message.is_empty() {
                println!("Signed in");
            } else {
                println!("{}", response.message);
            }
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let response = client.register(&username, &email, &password).await?;
            println!("{}", response.message);
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Signed out");
        }
        Commands::ResetPassword { email } => {
            let response = client.request_password_reset(&email).await?;
            println!("{}", response.message);
        }
        Commands::Status => {
            let status = chat.system_status().await?;
            println!("system: {}", status.system);
            for (name, state) in &status.components {
                println!("  {name}: {state}");
            }
        }
        Commands::Capabilities => {
            let caps = chat.capabilities().await?;
            println!("{} {}", caps.system_name, caps.version);
            for task in &caps.supported_tasks {
                println!("  {} ({}): {}", task.name, task.status, task.description);
            }
        }
        Commands::Sessions { command } => match command {
            SessionCommands::List { limit } => {
                let list = chat.sessions(limit).await?;
                print_json(&list.sessions)?;
            }
            SessionCommands::New => {
                let session = chat.new_session(None).await?;
                println!("{}", session.session_id);
            }
            SessionCommands::History { id, limit } => {
                let history = chat.session_history(&id, limit).await?;
                print_json(&history.messages)?;
            }
            SessionCommands::Archive { id } => {
                let result = chat.archive_session(&id).await?;
                println!("{}", result.message);
            }
            SessionCommands::Reset { id } => {
                let reset = chat.reset_session(id.as_deref()).await?;
                println!("{}", reset.session_id);
            }
        },
        Commands::Chat { message, session } => {
            let reply = chat.send_message(&message, session.as_deref()).await?;
            print_json(&reply)?;
        }
        Commands::Hashtags => {
            print_json(&FeedApi::new(client.clone()).top_hashtags().await?)?;
        }
        Commands::Knowledge { command } => {
            let knowledge = KnowledgeApi::new(client.clone());
            match command {
                KnowledgeCommands::Add {
                    content_id,
                    user_id,
                    platform,
                    summary,
                    timestamp,
                } => {
                    let item = KnowledgeItem {
                        content_id,
                        user_id,
                        platform,
                        summary,
                        timestamp: timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp()),
                    };
                    print_json(&knowledge.add_item(&item).await?)?;
                }
                KnowledgeCommands::Query {
                    user_id,
                    query,
                    top_k,
                    since,
                    platform,
                } => {
                    let mut request = KnowledgeQuery::new(user_id, query).top_k(top_k);
                    request.from_timestamp = since;
                    request.platform = platform;
                    print_json(&knowledge.query(&request).await?)?;
                }
            }
        }
        Commands::Video { command } => {
            let video = VideoApi::new(client.clone());
            match command {
                VideoCommands::Analyze { file } => {
                    let bytes = tokio::fs::read(&file)
                        .await
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let file_name = file
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("video.mp4");
                    let analysis = video.analyze(file_name, bytes).await?;
                    println!("[{}] {}", analysis.detected_language, analysis.summary);
                }
                VideoCommands::History => {
                    for analysis in video.history().await? {
                        println!(
                            "{} {} {}",
                            analysis.id,
                            analysis.created_at.to_rfc3339(),
                            analysis.summary
                        );
                    }
                }
            }
        }
        Commands::Poll { path, interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| client.config().poll_interval());
            let agent = Arc::new(PollingAgent::new(
                client.clone(),
                path,
                PollConfig::with_interval(interval),
            ));
            agent
                .on_update(|snapshot| {
                    println!("[{}] {}", snapshot.fetched_at.to_rfc3339(), snapshot.payload);
                })
                .await;

            let mut runner = {
                let agent = agent.clone();
                tokio::spawn(async move { agent.run().await })
            };

            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for ctrl-c")?;
                    agent.stop();
                    runner.await??;
                }
                joined = &mut runner => {
                    joined??;
                }
            }

            if agent.status().is_session_ended() {
                bail!("polling stopped: {:?}", agent.status());
            }
        }
    }

    Ok(())
}
