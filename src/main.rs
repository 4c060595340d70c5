use clap::Parser;
use outreachmap::cli::{
    run_add, run_config, run_delete, run_edit, run_edit_conversation, run_map, run_people,
    run_record, run_show, run_visit, Cli, Commands,
};
use outreachmap::config::Settings;
use outreachmap::db::Database;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::open()?;
    let settings = Settings::load(&db)?;

    match cli.command {
        None => {
            // No subcommand provided - open the map
            run_map(&db, &settings, None, None, None)?;
        }
        Some(Commands::Map(args)) => {
            run_map(&db, &settings, args.lat.as_deref(), args.lng.as_deref(), args.here)?;
        }
        Some(Commands::People(args)) => {
            run_people(&db, &args.search, args.category.as_deref())?;
        }
        Some(Commands::Show(args)) => {
            run_show(&db, &settings, &args.identifier)?;
        }
        Some(Commands::Add(args)) => {
            run_add(
                &db,
                &settings,
                args.at,
                args.nickname,
                args.age_group,
                args.category,
                args.features,
                args.photo,
            )?;
        }
        Some(Commands::Visit(args)) => {
            run_visit(&db, &settings, &args.identifier, args.at, &args.description)?;
        }
        Some(Commands::Edit(args)) => {
            run_edit(&db, &settings, &args.identifier)?;
        }
        Some(Commands::Record(args)) => {
            run_record(&db, &settings, &args.identifier, args.transcript)?;
        }
        Some(Commands::EditConversation(args)) => {
            run_edit_conversation(&db, &settings, &args.id, args.transcript, args.summary)?;
        }
        Some(Commands::Delete(args)) => {
            run_delete(&db, &settings, &args.identifier, args.force)?;
        }
        Some(Commands::Config(args)) => {
            run_config(&db, args.user.as_deref(), args.sign_out, args.center)?;
        }
    }

    Ok(())
}
