use thiserror::Error;

use crate::services::tabular::{self, Columns, Record};

const FIXED_CHOICE_COLUMNS: [&str; 4] = ["choicea", "choiceb", "choicec", "choiced"];

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ManifestError {
    #[error("manifest is empty")]
    Empty,
    #[error("manifest header has neither Choices nor ChoiceA..ChoiceD columns")]
    UnknownLayout,
    #[error("manifest header is missing the {0} column")]
    MissingColumn(&'static str),
    #[error("row {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("row {line}: {field} is required")]
    MissingField { line: usize, field: &'static str },
    #[error("row {line}: choice list is empty or contains a blank entry")]
    EmptyChoices { line: usize },
    #[error("row {line}: invalid correct answer designator {value:?}")]
    InvalidDesignator { line: usize, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ManifestLayout {
    /// QuestionText, HasImage, ImageFileName, ChoiceA..ChoiceD, CorrectAnswer (A-D).
    FixedColumns,
    /// QuestionText, ImageName, Choices (pipe separated), CorrectChoiceIndex (0-based).
    Delimited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManifestRow {
    pub(crate) line: usize,
    pub(crate) question_text: String,
    pub(crate) image_name: Option<String>,
    pub(crate) choices: Vec<String>,
    pub(crate) correct_index: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Manifest {
    pub(crate) layout: ManifestLayout,
    pub(crate) rows: Vec<ManifestRow>,
}

pub(crate) fn parse_manifest(text: &str) -> Result<Manifest, ManifestError> {
    let mut records = tabular::split_records(text)
        .map_err(|err| ManifestError::UnterminatedQuote { line: err.line })?
        .into_iter();
    let header = records.next().ok_or(ManifestError::Empty)?;
    let columns = Columns::from_header(&header.fields);

    let layout = if columns.has("choices") {
        ManifestLayout::Delimited
    } else if FIXED_CHOICE_COLUMNS.iter().any(|key| columns.has(key)) {
        ManifestLayout::FixedColumns
    } else {
        return Err(ManifestError::UnknownLayout);
    };

    let rows = match layout {
        ManifestLayout::FixedColumns => parse_fixed(&columns, records)?,
        ManifestLayout::Delimited => parse_delimited(&columns, records)?,
    };

    Ok(Manifest { layout, rows })
}

fn parse_fixed(
    columns: &Columns,
    records: impl Iterator<Item = Record>,
) -> Result<Vec<ManifestRow>, ManifestError> {
    let question_col = column(columns, "questiontext", "QuestionText")?;
    let has_image_col = columns.get("hasimage");
    let image_col = columns.get("imagefilename");
    let answer_col = column(columns, "correctanswer", "CorrectAnswer")?;
    let choice_cols = [
        column(columns, "choicea", "ChoiceA")?,
        column(columns, "choiceb", "ChoiceB")?,
        column(columns, "choicec", "ChoiceC")?,
        column(columns, "choiced", "ChoiceD")?,
    ];

    let mut rows = Vec::new();
    for record in records {
        let line = record.line;
        let question_text = required(&record, question_col, "QuestionText")?;

        let wants_image = has_image_col
            .and_then(|col| field(&record, col))
            .is_some_and(|value| matches!(value.to_ascii_lowercase().as_str(), "yes" | "y" | "true"));
        let image_name = if wants_image {
            let col = image_col.ok_or(ManifestError::MissingField { line, field: "ImageFileName" })?;
            Some(required(&record, col, "ImageFileName")?)
        } else {
            None
        };

        let mut choices = Vec::with_capacity(choice_cols.len());
        for (col, label) in choice_cols.iter().zip(["ChoiceA", "ChoiceB", "ChoiceC", "ChoiceD"]) {
            choices.push(required(&record, *col, label)?);
        }

        let designator = required(&record, answer_col, "CorrectAnswer")?;
        let correct_index = letter_index(&designator, choices.len())
            .ok_or(ManifestError::InvalidDesignator { line, value: designator })?;

        rows.push(ManifestRow { line, question_text, image_name, choices, correct_index });
    }

    Ok(rows)
}

fn parse_delimited(
    columns: &Columns,
    records: impl Iterator<Item = Record>,
) -> Result<Vec<ManifestRow>, ManifestError> {
    let question_col = column(columns, "questiontext", "QuestionText")?;
    let image_col = columns.get("imagename").or_else(|| columns.get("imagefilename"));
    let choices_col = column(columns, "choices", "Choices")?;
    let index_col = column(columns, "correctchoiceindex", "CorrectChoiceIndex")?;

    let mut rows = Vec::new();
    for record in records {
        let line = record.line;
        let question_text = required(&record, question_col, "QuestionText")?;
        let image_name = image_col.and_then(|col| field(&record, col));

        let raw_choices = required(&record, choices_col, "Choices")?;
        let choices: Vec<String> =
            raw_choices.split('|').map(|choice| choice.trim().to_string()).collect();
        if choices.iter().any(|choice| choice.is_empty()) {
            return Err(ManifestError::EmptyChoices { line });
        }

        let designator = required(&record, index_col, "CorrectChoiceIndex")?;
        let correct_index = designator
            .parse::<usize>()
            .ok()
            .filter(|index| *index < choices.len())
            .ok_or(ManifestError::InvalidDesignator { line, value: designator })?;

        rows.push(ManifestRow { line, question_text, image_name, choices, correct_index });
    }

    Ok(rows)
}

fn column(columns: &Columns, key: &str, label: &'static str) -> Result<usize, ManifestError> {
    columns.get(key).ok_or(ManifestError::MissingColumn(label))
}

fn field(record: &Record, col: usize) -> Option<String> {
    record.field(col).map(str::to_string)
}

fn required(record: &Record, col: usize, label: &'static str) -> Result<String, ManifestError> {
    field(record, col).ok_or(ManifestError::MissingField { line: record.line, field: label })
}

fn letter_index(value: &str, choice_count: usize) -> Option<usize> {
    let mut chars = value.chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !letter.is_ascii_uppercase() {
        return None;
    }
    let index = (letter as u8 - b'A') as usize;
    (index < choice_count).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_column_layout() {
        let text = "QuestionText,HasImage,ImageFileName,ChoiceA,ChoiceB,ChoiceC,ChoiceD,CorrectAnswer\n\
                    Capital of France?,No,,Paris,London,Berlin,Rome,a\n\
                    Which flag?,Yes,flags/fr.png,Blue,White,Red,Green,C\n";

        let manifest = parse_manifest(text).expect("manifest");

        assert_eq!(manifest.layout, ManifestLayout::FixedColumns);
        assert_eq!(manifest.rows.len(), 2);
        assert_eq!(manifest.rows[0].correct_index, 0);
        assert_eq!(manifest.rows[0].image_name, None);
        assert_eq!(manifest.rows[1].correct_index, 2);
        assert_eq!(manifest.rows[1].image_name.as_deref(), Some("flags/fr.png"));
        assert_eq!(manifest.rows[1].line, 3);
    }

    #[test]
    fn parses_delimited_layout() {
        let text = "QuestionText,ImageName,Choices,CorrectChoiceIndex\n\
                    Capital of France?,,Paris|London|Berlin,0\n";

        let manifest = parse_manifest(text).expect("manifest");

        assert_eq!(manifest.layout, ManifestLayout::Delimited);
        let row = &manifest.rows[0];
        assert_eq!(row.choices, vec!["Paris", "London", "Berlin"]);
        assert_eq!(row.correct_index, 0);
        assert_eq!(row.image_name, None);
    }

    #[test]
    fn header_lookup_ignores_case_and_spacing() {
        let text = " question text , choices ,correct_choice_index\r\nQ1,a|b,1\r\n";
        let manifest = parse_manifest(text).expect("manifest");
        assert_eq!(manifest.rows[0].correct_index, 1);
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let text = "QuestionText,Choices,CorrectChoiceIndex\n\
                    \"Pick one, carefully\",\"1,000|\"\"two\"\"|3\",2\n\
                    \"Multi\nline\",x|y,0\n";

        let manifest = parse_manifest(text).expect("manifest");

        assert_eq!(manifest.rows[0].question_text, "Pick one, carefully");
        assert_eq!(manifest.rows[0].choices, vec!["1,000", "\"two\"", "3"]);
        assert_eq!(manifest.rows[1].question_text, "Multi\nline");
        assert_eq!(manifest.rows[1].line, 3);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let text = "QuestionText,Choices,CorrectChoiceIndex\nQ,a|b,2\n";
        assert_eq!(
            parse_manifest(text).expect_err("invalid"),
            ManifestError::InvalidDesignator { line: 2, value: "2".to_string() }
        );
    }

    #[test]
    fn rejects_letter_outside_a_to_d() {
        let text = "QuestionText,ChoiceA,ChoiceB,ChoiceC,ChoiceD,CorrectAnswer\nQ,a,b,c,d,E\n";
        assert!(matches!(
            parse_manifest(text),
            Err(ManifestError::InvalidDesignator { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_blank_choice_entries() {
        let text = "QuestionText,Choices,CorrectChoiceIndex\nQ,a||c,0\n";
        assert!(matches!(parse_manifest(text), Err(ManifestError::EmptyChoices { line: 2 })));
    }

    #[test]
    fn declared_image_requires_file_name() {
        let text = "QuestionText,HasImage,ImageFileName,ChoiceA,ChoiceB,ChoiceC,ChoiceD,CorrectAnswer\n\
                    Q,Yes,,a,b,c,d,A\n";
        assert!(matches!(
            parse_manifest(text),
            Err(ManifestError::MissingField { line: 2, field: "ImageFileName" })
        ));
    }

    #[test]
    fn missing_question_text_names_the_row() {
        let text = "QuestionText,Choices,CorrectChoiceIndex\nQ1,a|b,0\n\n  ,a|b,0\n";
        assert!(matches!(
            parse_manifest(text),
            Err(ManifestError::MissingField { line: 4, field: "QuestionText" })
        ));
    }

    #[test]
    fn unknown_layout_and_empty_input() {
        assert_eq!(parse_manifest("").map(|m| m.rows.len()), Err(ManifestError::Empty));
        assert!(matches!(parse_manifest("QuestionText,Answer\n"), Err(ManifestError::UnknownLayout)));
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let text = "QuestionText,Choices,CorrectChoiceIndex\n\"Q,a|b,0\n";
        assert!(matches!(
            parse_manifest(text),
            Err(ManifestError::UnterminatedQuote { line: 2 })
        ));
    }
}
