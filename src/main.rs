use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use keycrypt::cli::{self, generate::GenerateOptions, AlgorithmArg, ExportFormat};
use keycrypt::config::{Settings, LOG_ENV};
use keycrypt::error::Result;
use keycrypt::keys::EcCurve;

#[derive(Parser)]
#[command(name = "keycrypt")]
#[command(author = "Oleg")]
#[command(version = "0.1.0")]
#[command(about = "Конвертация ключей RSA / ECDSA / Ed25519 и шифрование открытым ключом", long_about = None)]
struct Cli {
    /// Файл настроек (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Сгенерировать новую пару ключей
    Generate {
        /// Алгоритм ключа
        #[arg(short, long, value_enum, default_value = "ed25519")]
        algorithm: AlgorithmArg,

        /// Размер ключа RSA в битах
        #[arg(long)]
        bits: Option<usize>,

        /// Кривая ECDSA (P-256, P-384, P-521)
        #[arg(long)]
        curve: Option<EcCurve>,

        /// Путь к приватному ключу; публичный будет записан в <OUT>.pub
        #[arg(short, long)]
        out: PathBuf,

        /// Комментарий для формата OpenSSH
        #[arg(long)]
        comment: Option<String>,

        /// Перезаписать существующие файлы
        #[arg(long)]
        force: bool,

        /// Защитить приватный ключ паролем (зашифрованный PKCS#8)
        #[arg(long)]
        passphrase: bool,
    },

    /// Показать сведения о ключе
    Inspect {
        /// Файл ключа (PEM или строка authorized_keys)
        file: PathBuf,
    },

    /// Экспортировать ключ в другой формат
    Export {
        /// Файл ключа
        file: PathBuf,

        /// Формат вывода
        #[arg(short, long, value_enum)]
        format: ExportFormat,

        /// Экспортировать только публичную часть
        #[arg(long)]
        public: bool,

        /// Комментарий для форматов OpenSSH
        #[arg(long)]
        comment: Option<String>,

        /// Защитить результат паролем (только для pkcs8)
        #[arg(long)]
        passphrase: bool,
    },

    /// Зашифровать сообщение открытым ключом
    Encrypt {
        /// Файл ключа
        #[arg(short, long)]
        key: PathBuf,

        /// Сообщение
        message: String,
    },

    /// Расшифровать сообщение приватным ключом
    Decrypt {
        /// Файл приватного ключа
        #[arg(short, long)]
        key: PathBuf,

        /// Шифротекст в base64
        ciphertext: String,
    },

    /// Сгенерировать общий ключ AES
    CommonKeygen {
        /// Файл ключа (hex)
        #[arg(short, long)]
        out: PathBuf,

        /// Размер ключа в битах (128, 192, 256)
        #[arg(long, default_value_t = 256)]
        bits: usize,

        /// Перезаписать существующий файл
        #[arg(long)]
        force: bool,
    },

    /// Зашифровать сообщение общим ключом
    CommonEncrypt {
        /// Файл общего ключа
        #[arg(short, long)]
        key: PathBuf,

        /// Сообщение
        message: String,
    },

    /// Расшифровать сообщение общим ключом
    CommonDecrypt {
        /// Файл общего ключа
        #[arg(short, long)]
        key: PathBuf,

        /// Шифротекст в base64
        ciphertext: String,
    },
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = Settings::load(cli.config.as_deref()).and_then(|settings| {
        init_logging(&settings.log_filter);
        run(cli.command, &settings)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Ошибка:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, settings: &Settings) -> Result<()> {
    match command {
        Commands::Generate {
            algorithm,
            bits,
            curve,
            out,
            comment,
            force,
            passphrase,
        } => {
            let secret = if passphrase {
                Some(cli::prompt_new_passphrase()?)
            } else {
                None
            };
            cli::generate::run(
                settings,
                &GenerateOptions {
                    algorithm,
                    bits,
                    curve,
                    out,
                    comment,
                    force,
                    encrypt: passphrase,
                },
                secret.as_ref().map(|p| p.as_bytes()),
            )
        }
        Commands::Inspect { file } => cli::inspect::run(&file),
        Commands::Export {
            file,
            format,
            public,
            comment,
            passphrase,
        } => {
            let secret = if passphrase {
                Some(cli::prompt_new_passphrase()?)
            } else {
                None
            };
            cli::export::run(
                &file,
                format,
                public,
                comment.as_deref().unwrap_or(&settings.comment),
                secret.as_ref().map(|p| p.as_bytes()),
            )
        }
        Commands::Encrypt { key, message } => cli::crypt::encrypt(&key, &message),
        Commands::Decrypt { key, ciphertext } => cli::crypt::decrypt(&key, &ciphertext),
        Commands::CommonKeygen { out, bits, force } => cli::common::keygen(&out, bits, force),
        Commands::CommonEncrypt { key, message } => cli::common::encrypt(&key, &message),
        Commands::CommonDecrypt { key, ciphertext } => cli::common::decrypt(&key, &ciphertext),
    }
}
