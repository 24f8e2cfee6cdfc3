//! Interface de linha de comando do rollcall baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (classes, roster,
//! session, demo) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::session::Mark;

/// rollcall: chamada em sala com três verificações aleatórias de presença.
#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./rollcall.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (log em nível debug).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista ou remove as turmas salvas.
    Classes {
        #[command(subcommand)]
        action: Option<ClassAction>,
    },

    /// Monta ou edita a lista de alunos de uma turma.
    Roster {
        /// Nome da turma (criada na primeira escrita).
        class: String,

        #[command(subcommand)]
        action: RosterAction,
    },

    /// Conduz uma sessão interativa de três verificações.
    Session {
        /// Nome da turma.
        class: String,

        /// Envia o relatório ao webhook configurado ao final.
        #[arg(long, default_value_t = false)]
        export: bool,
    },

    /// Executa a demonstração embutida com dois alunos.
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ClassAction {
    /// Mostra as turmas salvas (padrão).
    List,

    /// Apaga uma turma e sua lista de alunos.
    Remove { class: String },
}

#[derive(Debug, Subcommand)]
pub enum RosterAction {
    /// Mostra os alunos da turma.
    List,

    /// Adiciona alunos pelo nome.
    Add {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Remove um aluno (nome ou posição na lista).
    Remove { who: String },

    /// Remove todos os alunos.
    Clear,

    /// Importa alunos de um arquivo CSV com cabeçalho.
    ImportCsv { file: PathBuf },

    /// Vincula uma planilha publicada (CSV) e importa os alunos.
    LinkSheet { url: String },

    /// Extrai nomes de texto livre usando o serviço de texto.
    Extract {
        /// Texto colado com os nomes.
        text: Option<String>,

        /// Lê o texto de um arquivo.
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
}

/// Status aceito nos comandos de marcação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarkArg {
    Present,
    Absent,
}

impl From<MarkArg> for Mark {
    fn from(arg: MarkArg) -> Self {
        match arg {
            MarkArg::Present => Mark::Present,
            MarkArg::Absent => Mark::Absent,
        }
    }
}
