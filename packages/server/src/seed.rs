use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::problem::Difficulty;
use crate::entity::{problem, submission, test_case};

struct SeedProblem {
    title: &'static str,
    statement: &'static str,
    difficulty: Difficulty,
    /// (input, expected output, is sample)
    cases: &'static [(&'static str, &'static str, bool)],
}

const SAMPLE_PROBLEMS: &[SeedProblem] = &[
    SeedProblem {
        title: "Sum of Two Numbers",
        statement: "Read two integers A and B on one line and print A + B.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("10 20", "30", true),
            ("-5 5", "0", true),
            ("100 200", "300", false),
            ("0 0", "0", false),
            ("123 456", "579", false),
        ],
    },
    SeedProblem {
        title: "Factorial Calculation",
        statement: "Given N (0 <= N <= 12), print N!.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("5", "120", true),
            ("0", "1", true),
            ("3", "6", false),
            ("10", "3628800", false),
            ("1", "1", false),
        ],
    },
    SeedProblem {
        title: "Even or Odd",
        statement: "Given an integer N, print 'Even' or 'Odd'.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("4", "Even", true),
            ("7", "Odd", true),
            ("0", "Even", false),
            ("-2", "Even", false),
            ("1001", "Odd", false),
        ],
    },
    SeedProblem {
        title: "Palindrome Check",
        statement: "Given a word, print 'Yes' if it reads the same backwards, otherwise 'No'.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("madam", "Yes", true),
            ("hello", "No", true),
            ("racecar", "Yes", false),
            ("aba", "Yes", false),
            ("abc", "No", false),
        ],
    },
    SeedProblem {
        title: "Reverse String",
        statement: "Print the input line reversed.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("abc", "cba", true),
            ("Bangla", "algnaB", true),
            ("12345", "54321", false),
            ("a", "a", false),
            ("hello world", "dlrow olleh", false),
        ],
    },
    SeedProblem {
        title: "Leap Year",
        statement: "Given a year, print 'Yes' if it is a leap year, otherwise 'No'.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("2000", "Yes", true),
            ("1900", "No", true),
            ("2024", "Yes", false),
            ("2023", "No", false),
            ("1600", "Yes", false),
        ],
    },
    SeedProblem {
        title: "Count Vowels",
        statement: "Print the number of vowels (a, e, i, o, u, either case) in the input line.",
        difficulty: Difficulty::Easy,
        cases: &[
            ("Independent", "4", true),
            ("AEIOU", "5", true),
            ("bcdfg", "0", false),
            ("Hello World", "3", false),
            ("apple", "2", false),
        ],
    },
    SeedProblem {
        title: "Find Maximum",
        statement: "The first line holds N, the second N integers. Print the largest.",
        difficulty: Difficulty::Medium,
        cases: &[
            ("5\n1 5 3 9 2", "9", true),
            ("3\n-1 -5 -2", "-1", true),
            ("1\n10", "10", false),
            ("4\n0 0 0 0", "0", false),
            ("5\n10 20 5 30 15", "30", false),
        ],
    },
    SeedProblem {
        title: "Fibonacci Number",
        statement: "Given N (0 <= N <= 30), print the N-th Fibonacci number, starting 0, 1, 1, 2.",
        difficulty: Difficulty::Medium,
        cases: &[
            ("0", "0", true),
            ("1", "1", true),
            ("5", "5", false),
            ("10", "55", false),
            ("20", "6765", false),
        ],
    },
    SeedProblem {
        title: "Prime Check",
        statement: "Given N, print 'Yes' if N is prime, otherwise 'No'.",
        difficulty: Difficulty::Medium,
        cases: &[
            ("7", "Yes", true),
            ("10", "No", true),
            ("2", "Yes", false),
            ("1", "No", false),
            ("97", "Yes", false),
        ],
    },
];

/// Seed the sample problem set when the problem table is empty.
pub async fn seed_sample_problems(db: &DatabaseConnection) -> Result<(), DbErr> {
    if problem::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let txn = db.begin().await?;
    let now = chrono::Utc::now();
    for sample in SAMPLE_PROBLEMS {
        let model = problem::ActiveModel {
            title: Set(sample.title.to_string()),
            statement: Set(sample.statement.to_string()),
            difficulty: Set(sample.difficulty),
            points: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let cases = sample
            .cases
            .iter()
            .enumerate()
            .map(|(position, &(input, expected, is_sample))| test_case::ActiveModel {
                position: Set(position as i32),
                input: Set(input.to_string()),
                expected_output: Set(expected.to_string()),
                is_sample: Set(is_sample),
                problem_id: Set(model.id),
                ..Default::default()
            });
        test_case::Entity::insert_many(cases)
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!("Seeded {} sample problems", SAMPLE_PROBLEMS.len());
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Judging order: WHERE problem_id = ? ORDER BY position, id
    let test_case_order = Index::create()
        .if_not_exists()
        .name("idx_test_case_problem_position")
        .table(test_case::Entity)
        .col(test_case::Column::ProblemId)
        .col(test_case::Column::Position)
        .to_string(PostgresQueryBuilder);

    // Per-user submission history
    let submission_history = Index::create()
        .if_not_exists()
        .name("idx_submission_user_created")
        .table(submission::Entity)
        .col(submission::Column::UserId)
        .col(submission::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    for (name, stmt) in [
        ("idx_test_case_problem_position", test_case_order),
        ("idx_submission_user_created", submission_history),
    ] {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
