//! Extraction prompt, generated from the schema descriptor so the prompt
//! and the mapper can never disagree on column names or order.

use std::fmt::Write;

use crate::model::Column;
use crate::schema::{ExtractionSchema, KeyStyle};

/// Sample values used in the prompt's example row.
fn example_value(column: Column) -> &'static str {
    match column {
        Column::Hora => "\"07:00\"",
        Column::SteamTotal => "52863.5",
        Column::SteamTemp => "524",
        Column::SteamPressure => "84",
        Column::WaterTotal => "55320.7",
        Column::WaterTemp => "118",
        Column::WaterPressure => "102",
        Column::BagasseInTotal => "18240.3",
        Column::BagasseOutTotal => "0",
        Column::ChopperTotal => "0",
    }
}

/// Build the instruction text sent alongside the image.
pub fn build_prompt(schema: &ExtractionSchema) -> String {
    let mut out = String::new();
    out.push_str("Actúa como un digitador experto en ingenios azucareros.\n");
    out.push_str(
        "Analiza esta imagen (puede ser una bitácora manuscrita o una tabla digital).\n\n",
    );
    out.push_str("TU MISIÓN:\nExtraer los datos numéricos de las columnas visibles.\n\n");

    out.push_str("REGLAS CRÍTICAS:\n");
    out.push_str("1. Si una columna no aparece en la imagen, devuélvela con valor 0.\n");
    out.push_str("2. NO calcules diferencias (Tons), solo lee lo que ves.\n");
    out.push_str("3. Devuelve SOLAMENTE un Array JSON válido. Sin texto extra, sin markdown.\n");
    match schema.key_style {
        KeyStyle::Positional => out.push_str(
            "4. Cada fila es un arreglo con un valor por columna, en el orden indicado abajo.\n",
        ),
        KeyStyle::Named | KeyStyle::ShortCodes => out.push_str(
            "4. Cada fila es un objeto; usa exactamente las claves indicadas abajo.\n",
        ),
    }
    out.push('\n');

    out.push_str("COLUMNAS A BUSCAR (Mapeo):\n");
    for (i, column) in schema.columns().iter().enumerate() {
        let _ = match schema.key_style {
            KeyStyle::Positional => {
                writeln!(out, "{}. Posición {}: {}", i + 1, i, column.description())
            }
            KeyStyle::Named if column.description() == column.key() => {
                writeln!(out, "{}. \"{}\"", i + 1, column.key())
            }
            KeyStyle::Named => {
                writeln!(out, "{}. \"{}\" = {}", i + 1, column.key(), column.description())
            }
            KeyStyle::ShortCodes => writeln!(
                out,
                "{}. \"{}\" = {}",
                i + 1,
                schema.prompt_key(*column),
                column.description()
            ),
        };
    }

    out.push_str("\nEjemplo de Salida JSON:\n");
    out.push_str(&example_output(schema));
    out
}

fn example_output(schema: &ExtractionSchema) -> String {
    let cells: Vec<String> = match schema.key_style {
        KeyStyle::Positional => {
            schema.columns().iter().map(|c| example_value(*c).to_string()).collect()
        }
        KeyStyle::Named | KeyStyle::ShortCodes => schema
            .columns()
            .iter()
            .map(|c| format!("\"{}\": {}", schema.prompt_key(*c), example_value(*c)))
            .collect(),
    };

    match schema.key_style {
        KeyStyle::Positional => format!("[\n  [{}]\n]\n", cells.join(", ")),
        KeyStyle::Named | KeyStyle::ShortCodes => {
            format!("[\n  {{\n    {}\n  }}\n]\n", cells.join(",\n    "))
        }
    }
}
