// src/cli.rs
//! One-shot maintenance subcommands that run without the HTTP server

use sqlx::SqlitePool;

use crate::services::IdentityProvider;
use crate::sync::{mapping_status, reconcile_mappings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SyncMappings,
    MappingStatus,
}

/// First non-flag argument naming a known subcommand
pub fn parse_command(args: &[String]) -> Option<Command> {
    args.iter()
        .skip(1)
        .filter(|a| !a.starts_with("--"))
        .find_map(|a| match a.as_str() {
            "sync-mappings" => Some(Command::SyncMappings),
            "mapping-status" => Some(Command::MappingStatus),
            _ => None,
        })
}

pub async fn run(
    command: Command,
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
) -> anyhow::Result<()> {
    match command {
        Command::SyncMappings => {
            let report = reconcile_mappings(pool, provider).await?;
            println!("🔄 Supabase mapping sync");
            println!("   Total users:     {}", report.total_users);
            println!("   Already mapped:  {}", report.already_mapped);
            println!("   Created:         {}", report.created);
            println!("   Not in Supabase: {}", report.not_found);
            println!("   Failed:          {}", report.failed);
            for e in &report.errors {
                println!("     - {}", e);
            }
            println!(
                "✅ {} ({} mapped, {} remaining)",
                report.message, report.final_mapped, report.remaining
            );
        }
        Command::MappingStatus => {
            let status = mapping_status(pool, provider).await?;
            println!("📊 Mapping status");
            println!("   Total users: {}", status.total_users);
            println!("   Mapped:      {}", status.mapped);
            println!("   Unmapped:    {}", status.unmapped);
            for user in &status.unmapped_users {
                println!("     - {} ({})", user.email, user.username);
            }
            match (&status.supabase_users, &status.supabase_error) {
                (Some(count), _) => {
                    println!("   Supabase users: {}", count);
                    println!(
                        "   Supabase users without mapping: {}",
                        status.orphaned_supabase_ids.len()
                    );
                    for id in &status.orphaned_supabase_ids {
                        println!("     - {}", id);
                    }
                }
                (None, Some(err)) => println!("   ⚠️  Supabase unavailable: {}", err),
                (None, None) => println!("   Supabase not configured"),
            }
        }
    }

    Ok(())
}
