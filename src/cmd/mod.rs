use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::warn;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ServerConfig;
use crate::error::{StoreError, ValidationError};
use crate::store::{AccountStore, NewPhrase, PhraseStore, Role};

/// classroom typing practice server
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub config: ServerConfig,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// run the HTTP and websocket server (default)
    Serve,

    /// manage typing phrases
    #[clap(subcommand)]
    Phrase(PhraseCommand),

    /// manage accounts
    #[clap(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum PhraseCommand {
    /// add a single phrase
    Add {
        text: String,
        #[clap(short, long, default_value_t = 1)]
        difficulty: i32,
    },

    /// import the `quote` column of a CSV file
    Import {
        file: PathBuf,
        #[clap(short, long, default_value_t = 1)]
        difficulty: i32,
        #[clap(long, default_value_t = ';')]
        delimiter: char,
    },

    /// list stored phrases
    List,

    /// remove a phrase by id
    Remove { id: i32 },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// create an account and print its API token
    Add {
        username: String,
        #[clap(short, long, default_value = "aluno")]
        role: Role,
    },
}

#[derive(Debug, Error)]
pub enum CmdError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not read {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(char),

    #[error("phrase {0} not found")]
    NotFound(i32),
}

#[derive(Debug, Deserialize)]
struct QuoteRecord {
    quote: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Runs an admin command. Returns `false` for `serve`, which the caller handles.
pub fn run<S>(command: &Command, store: &S) -> Result<bool, CmdError>
where
    S: AccountStore + PhraseStore,
{
    match command {
        Command::Serve => return Ok(false),

        Command::Phrase(PhraseCommand::Add { text, difficulty }) => {
            let phrase = store.create(NewPhrase::new(text, *difficulty, None)?)?;
            println!("Added phrase #{} at difficulty {}.", phrase.id, phrase.difficulty);
        }

        Command::Phrase(PhraseCommand::Import {
            file,
            difficulty,
            delimiter,
        }) => {
            let reader = File::open(file).map_err(|e| CmdError::Io(file.clone(), e))?;
            let summary = import_phrases(reader, *delimiter, *difficulty, store)?;
            println!(
                "Imported {} phrase(s), skipped {}.",
                summary.imported, summary.skipped
            );
        }

        Command::Phrase(PhraseCommand::List) => {
            for phrase in store.list()? {
                println!("#{}\t[{}]\t{}", phrase.id, phrase.difficulty, phrase.text);
            }
        }

        Command::Phrase(PhraseCommand::Remove { id }) => {
            if !store.delete(*id)? {
                return Err(CmdError::NotFound(*id));
            }
            println!("Removed phrase #{}.", id);
        }

        Command::User(UserCommand::Add { username, role }) => {
            let (account, token) = store.create_account(username, *role)?;
            println!(
                "Created {} #{} ({}). Token: {}",
                account.username, account.id, account.role, token
            );
        }
    }
    Ok(true)
}

pub fn import_phrases<R: Read>(
    reader: R,
    delimiter: char,
    difficulty: i32,
    store: &dyn PhraseStore,
) -> Result<ImportSummary, CmdError> {
    if !delimiter.is_ascii() {
        return Err(CmdError::Delimiter(delimiter));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .from_reader(reader);

    let mut summary = ImportSummary::default();
    for result in rdr.deserialize::<QuoteRecord>() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("failed to parse record: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        match NewPhrase::new(&record.quote, difficulty, None) {
            Ok(phrase) => {
                store.create(phrase)?;
                summary.imported += 1;
            }
            Err(e) => {
                warn!("skipping quote {:?}: {}", record.quote, e);
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}
