use std::fmt;
use std::str::FromStr;

/// Mount point of the per-execution scratch directory inside every runner image.
pub const SANDBOX_DIR: &str = "/home/sandbox/temp";

/// Name of the file holding stdin inside the scratch directory.
pub const INPUT_FILE: &str = "input.txt";

/// Languages the judge can compile and run.
///
/// Every variant maps to a runner image `<name>-runner` that provides the
/// toolchain. Sources are written with a fixed filename, which keeps Java's
/// public-class naming rule satisfied without renaming user code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Cpp,
    C,
    Java,
    Kotlin,
    Go,
    Php,
    Dart,
    Sql,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Self::Python,
        Self::Cpp,
        Self::C,
        Self::Java,
        Self::Kotlin,
        Self::Go,
        Self::Php,
        Self::Dart,
        Self::Sql,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Go => "go",
            Self::Php => "php",
            Self::Dart => "dart",
            Self::Sql => "sql",
        }
    }

    pub fn source_file(&self) -> &'static str {
        match self {
            Self::Python => "main.py",
            Self::Cpp => "main.cpp",
            Self::C => "main.c",
            Self::Java => "Main.java",
            Self::Kotlin => "main.kt",
            Self::Go => "main.go",
            Self::Php => "main.php",
            Self::Dart => "main.dart",
            Self::Sql => "main.sql",
        }
    }

    pub fn default_image(&self) -> String {
        format!("{}-runner", self.name())
    }

    /// Shell command compiling the source in place, if the language needs one.
    pub fn compile_command(&self) -> Option<String> {
        let dir = SANDBOX_DIR;
        match self {
            Self::Cpp => Some(format!("g++ -o {dir}/main {dir}/main.cpp -std=c++17")),
            Self::C => Some(format!("gcc -o {dir}/main {dir}/main.c")),
            Self::Java => Some(format!("javac {dir}/Main.java")),
            Self::Kotlin => Some(format!(
                "kotlinc {dir}/main.kt -include-runtime -d {dir}/main.jar"
            )),
            Self::Python | Self::Go | Self::Php | Self::Dart | Self::Sql => None,
        }
    }

    /// Shell command running the program. Callers supply stdin around it, so
    /// the command must be wrapped in a subshell before any redirection.
    pub fn run_command(&self) -> String {
        let dir = SANDBOX_DIR;
        match self {
            Self::Python => format!("python3 {dir}/main.py"),
            Self::Cpp | Self::C => format!("{dir}/main"),
            Self::Java => format!("java -cp {dir} Main"),
            Self::Kotlin => format!("java -jar {dir}/main.jar"),
            Self::Go => format!("go run {dir}/main.go"),
            Self::Php => format!("php {dir}/main.php"),
            Self::Dart => format!("dart run {dir}/main.dart"),
            Self::Sql => format!("sqlite3 :memory: < {dir}/main.sql"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|lang| lang.name() == lower)
            .copied()
            .ok_or_else(|| UnsupportedLanguage(s.to_string()))
    }
}
