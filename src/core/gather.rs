// LitmusLog - core/gather.rs
//
// Assembles generated `.tex` tables into one printable document. Each input
// is centred on its own page.

use std::path::{Path, PathBuf};

const PREAMBLE: &str = "\\documentclass{article}\n\
\\usepackage[margin=1cm]{geometry}\n\
\\begin{document}\n";

const POSTAMBLE: &str = "\\end{document}\n";

/// Build the gathered document for `inputs`, in the given order.
///
/// Inputs are referenced with `\input` by file name, so the document must be
/// compiled from the directory that holds them.
pub fn gather_document(inputs: &[PathBuf]) -> String {
    let mut doc = String::from(PREAMBLE);
    for (i, input) in inputs.iter().enumerate() {
        if i > 0 {
            doc.push_str("\\newpage\n");
        }
        doc.push_str("\\begin{center}\n");
        doc.push_str(&format!("\\input{{{}}}\n", input_name(input)));
        doc.push_str("\\end{center}\n");
    }
    doc.push_str(POSTAMBLE);
    doc
}

fn input_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
