use std::io::{BufRead, Write};

use crate::answer::AnswerSheet;
use crate::error::{Error, Result};
use crate::survey::{DemographicField, Response, Survey};

/// Line-oriented questionnaire. Every item needs an explicit answer; an
/// empty line is asked again rather than taken as a default.
pub struct Collector<'a> {
    survey: &'a Survey,
}

impl<'a> Collector<'a> {
    pub fn new(survey: &'a Survey) -> Self {
        Self { survey }
    }

    pub fn run<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<Response> {
        let mut response = Response::default();
        writeln!(output, "{}", self.survey.title)?;

        for field in self.survey.demographics {
            let choice = ask_choice(field, input, output)?;
            response
                .demographics
                .insert(field.name.to_string(), choice.to_string());
        }

        for &instrument in &self.survey.instruments {
            writeln!(output)?;
            writeln!(output, "{}", instrument.title)?;
            writeln!(output, "{}", instrument.instruction)?;
            let mut sheet = AnswerSheet::new(instrument);
            for question in instrument.questions() {
                writeln!(output, "{}. {}", question.id, question.text)?;
                for score in &instrument.scores {
                    write!(output, "  {} => {}", score.score, score.text)?;
                }
                loop {
                    writeln!(output)?;
                    let line = read_line(input)?.ok_or_else(|| Error::NotFulfilled {
                        instrument: instrument.key.clone(),
                        item: question.id,
                    })?;
                    let stored = line
                        .parse::<u8>()
                        .ok()
                        .map(|rating| sheet.insert(question.id, rating));
                    match stored {
                        Some(Ok(())) => break,
                        _ => write!(
                            output,
                            "Répondez par un nombre entre {} et {}.",
                            instrument.scale.min, instrument.scale.max
                        )?,
                    }
                }
            }
            response
                .answers
                .insert(instrument.key.clone(), sheet.into_ratings()?);
        }
        Ok(response)
    }
}

fn ask_choice<R: BufRead, W: Write>(
    field: &DemographicField,
    input: &mut R,
    output: &mut W,
) -> Result<&'static str> {
    writeln!(output, "{}", field.label)?;
    for (index, choice) in field.choices.iter().enumerate() {
        writeln!(output, "  {} => {}", index + 1, choice)?;
    }
    loop {
        let line =
            read_line(input)?.ok_or_else(|| Error::MissingDemographic(field.name.to_string()))?;
        match line.parse::<usize>() {
            Ok(number) if (1..=field.choices.len()).contains(&number) => {
                return Ok(field.choices[number - 1])
            }
            _ => writeln!(
                output,
                "Choisissez un numéro entre 1 et {}.",
                field.choices.len()
            )?,
        }
    }
}

/// Next trimmed line, `None` at end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut buffer = String::new();
    if input.read_line(&mut buffer)? == 0 {
        return Ok(None);
    }
    Ok(Some(buffer.trim().to_string()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scorer::Total;
    use crate::survey::{DAS_PANAS, DAS_PERCEPTION};
    use std::io::Cursor;

    fn answers(lines: &[&str]) -> Cursor<Vec<u8>> {
        Cursor::new(lines.join("\n").into_bytes())
    }

    #[test]
    fn test_collect_das_panas() {
        let lines = vec!["3"; 14 + 20];
        let mut output = Vec::new();
        let response = Collector::new(&DAS_PANAS)
            .run(&mut answers(&lines), &mut output)
            .unwrap();
        let scored = DAS_PANAS.score(response).unwrap();
        assert_eq!(scored.total("das_total").unwrap().value, Total::Sum(42));
        assert_eq!(scored.total("pa_total").unwrap().value, Total::Sum(30));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Vous êtes bloqué(e) dans un embouteillage."));
    }

    #[test]
    fn test_invalid_and_empty_answers_are_asked_again() {
        let mut lines = vec!["", "9", "abc", "2"];
        lines.extend(vec!["1"; 13 + 20]);
        let mut output = Vec::new();
        let response = Collector::new(&DAS_PANAS)
            .run(&mut answers(&lines), &mut output)
            .unwrap();
        assert_eq!(response.answers["das"].get(1), Some(2));
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Répondez par un nombre entre 1 et 5.").count(), 3);
    }

    #[test]
    fn test_end_of_input_is_not_an_answer() {
        let lines = vec!["4"; 10];
        let result = Collector::new(&DAS_PANAS).run(&mut answers(&lines), &mut Vec::new());
        assert!(matches!(
            result,
            Err(Error::NotFulfilled { item: 11, .. })
        ));
    }

    #[test]
    fn test_demographic_choices() {
        let mut lines = vec!["2", "0", "1", "4", "1"];
        lines.extend(vec!["5"; 14 + 10]);
        let response = Collector::new(&DAS_PERCEPTION)
            .run(&mut answers(&lines), &mut Vec::new())
            .unwrap();
        assert_eq!(response.demographics["sex"], "Femme");
        assert_eq!(response.demographics["age_group"], "18-25");
        assert_eq!(response.demographics["licence_years"], "Plus de 10 ans");
        assert_eq!(response.demographics["driving_frequency"], "Tous les jours");
        let scored = DAS_PERCEPTION.score(response).unwrap();
        assert_eq!(
            scored.total("self_efficacy").unwrap().value,
            Total::Mean(5.0)
        );
    }
}
