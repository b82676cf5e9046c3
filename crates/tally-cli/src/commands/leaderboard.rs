//! Leaderboard operations, run through the JSON command surface

use crate::{Commands, PolicyArgs};
use anyhow::{bail, Context, Result};
use tally::{Command, EntryInput, Options, TallyDb};

fn options(policy: &PolicyArgs) -> Result<Option<Options>> {
    if let Some(raw) = &policy.options {
        return Options::decode(raw.as_bytes()).context("Invalid --options");
    }
    if policy.no_options {
        return Ok(None);
    }
    Ok(Some(Options {
        construct_from: policy.construct_from.clone(),
        capacity: policy.capacity,
        expire_at: policy.expire_at,
        idle_expire: policy.idle_expire,
    }))
}

fn entry(id: String, score: f64, info: Option<String>) -> EntryInput {
    let entry = EntryInput::new(id, score);
    match info {
        Some(info) => entry.with_info(info),
        None => entry,
    }
}

fn to_command(policy: &PolicyArgs, command: Commands) -> Result<Command> {
    let options = options(policy)?;
    Ok(match command {
        Commands::Touch { key } => Command::Touch { key, options },
        Commands::SetScore {
            key,
            id,
            score,
            info,
        } => Command::SetScore {
            key,
            options,
            entries: vec![entry(id, score, info)],
        },
        Commands::IncScore {
            key,
            id,
            delta,
            info,
        } => Command::IncScore {
            key,
            options,
            entries: vec![entry(id, delta, info)],
        },
        Commands::SetInfo { key, id, info } => Command::SetInfo {
            key,
            options,
            entries: vec![entry(id, 0.0, Some(info))],
        },
        Commands::GetRange { key, start, stop } => Command::GetRange {
            key,
            options,
            start,
            stop,
        },
        Commands::Get { key, id } => Command::GetById { key, options, id },
        Commands::Remove { key, ids } => Command::RemoveId { key, options, ids },
        Commands::Append { key, ids } => Command::Append {
            key,
            options,
            entries: ids.into_iter().map(|id| EntryInput::new(id, 0.0)).collect(),
        },
        Commands::SwapId { key, a, b } => Command::SwapById {
            key,
            options,
            id_a: a,
            id_b: b,
        },
        Commands::SwapRank { key, a, b } => Command::SwapByRank {
            key,
            options,
            rank_a: a,
            rank_b: b,
        },
        Commands::Exec { .. } | Commands::Status { .. } => {
            bail!("not a leaderboard operation")
        }
    })
}

pub fn execute(db: &TallyDb, policy: &PolicyArgs, command: Commands) -> Result<()> {
    let command = to_command(policy, command)?;
    tracing::debug!(key = command.key(), "Dispatching command");

    let reply = db
        .dispatch(&command)
        .with_context(|| format!("Operation on {:?} failed", command.key()))?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

pub fn exec(db: &TallyDb, json: &str) -> Result<()> {
    let reply = db
        .dispatch_json(json.as_bytes())
        .context("Command failed")?;
    let reply: serde_json::Value = serde_json::from_slice(&reply)?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
