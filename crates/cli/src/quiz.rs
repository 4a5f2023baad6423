//! Interactive questionnaire over a line-oriented terminal.
//!
//! Each question is printed with numbered options. Besides an option number the user may type
//! `b` (back), `r` (restart), `a` (analyse the symptoms gathered so far), `t <text>` (describe
//! symptoms in free text) or `q` (quit).
//!
//! Symptoms can also be edited by id: `s` lists the known symptoms, `+ <id>` adds one and
//! `- <id>` removes one.

use std::io::{BufRead, Write};
use triage_core::{DiagnosisResult, QuizSession};

enum Command {
    Choose(usize),
    Back,
    Restart,
    Analyse,
    Describe(String),
    ListSymptoms,
    AddSymptom(String),
    RemoveSymptom(String),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line {
        "b" => Some(Command::Back),
        "r" => Some(Command::Restart),
        "a" => Some(Command::Analyse),
        "s" => Some(Command::ListSymptoms),
        "q" => Some(Command::Quit),
        _ => {
            if let Some(text) = line.strip_prefix("t ") {
                return Some(Command::Describe(text.to_string()));
            }
            if let Some(id) = line.strip_prefix("+ ") {
                return Some(Command::AddSymptom(id.trim().to_string()));
            }
            if let Some(id) = line.strip_prefix("- ") {
                return Some(Command::RemoveSymptom(id.trim().to_string()));
            }
            line.parse::<usize>().ok().map(Command::Choose)
        }
    }
}

/// Runs `session` to completion against `input`.
///
/// Returns `None` if the user quits or input ends before a result is reached. Engine
/// rejections are printed and the prompt repeats.
pub fn run<R: BufRead, W: Write>(
    session: &mut QuizSession,
    input: R,
    out: &mut W,
) -> anyhow::Result<Option<DiagnosisResult>> {
    let mut lines = input.lines();

    while let Some(question) = session.current_question() {
        writeln!(out)?;
        writeln!(
            out,
            "[{:.0}%] {}",
            session.progress_percentage(),
            question.prompt()
        )?;
        for (i, option) in question.options().iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, option.display_text())?;
        }
        write!(out, "> ")?;
        out.flush()?;

        let option_ids: Vec<String> = question
            .options()
            .iter()
            .map(|o| o.id().to_string())
            .collect();

        let Some(line) = lines.next() else {
            return Ok(None);
        };
        let line = line?;

        let outcome = match parse_command(&line) {
            Some(Command::Choose(n)) if (1..=option_ids.len()).contains(&n) => {
                session.answer(&option_ids[n - 1]).map(|_| ())
            }
            Some(Command::Choose(_)) | None => {
                writeln!(
                    out,
                    "Enter an option number, or b, r, a, t <text>, s, + <id>, - <id>, q"
                )?;
                continue;
            }
            Some(Command::Back) => session.back().map(|_| ()),
            Some(Command::Restart) => {
                session.restart();
                Ok(())
            }
            Some(Command::Analyse) => session.run_analysis().map(|_| ()),
            Some(Command::Describe(text)) => match session.ingest_text(&text) {
                Ok(added) => {
                    let names: Vec<&str> = added.iter().map(|s| s.name()).collect();
                    writeln!(out, "Recognised: {}", names.join(", "))?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Some(Command::ListSymptoms) => {
                for symptom in session.vocabulary().iter() {
                    let mark = if session.symptoms().iter().any(|s| s.id() == symptom.id()) {
                        '*'
                    } else {
                        ' '
                    };
                    writeln!(out, " {mark} {:<4} {}", symptom.id(), symptom.name())?;
                }
                Ok(())
            }
            Some(Command::AddSymptom(id)) => {
                let Some(symptom) = session.vocabulary().get(&id).cloned() else {
                    writeln!(out, "Unknown symptom '{id}'")?;
                    continue;
                };
                match session.add_symptom(symptom) {
                    Ok(added) => {
                        if added {
                            writeln!(out, "Added {id}")?;
                        } else {
                            writeln!(out, "{id} already reported")?;
                        }
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Some(Command::RemoveSymptom(id)) => match session.remove_symptom(&id) {
                Ok(Some(symptom)) => {
                    writeln!(out, "Removed {}", symptom.name())?;
                    Ok(())
                }
                Ok(None) => {
                    writeln!(out, "{id} was not reported")?;
                    Ok(())
                }
                Err(e) => Err(e),
            },
            Some(Command::Quit) => return Ok(None),
        };

        if let Err(e) = outcome {
            tracing::debug!("rejected: {e}");
            writeln!(out, "{e}")?;
        }
    }

    Ok(session.result().cloned())
}
