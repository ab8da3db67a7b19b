use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::warn;

use crate::distances::DisorderReport;
use crate::error::{NewickError, TreeError};
use crate::newick::{parse_all, to_newick};
use crate::tree::Node;

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Read a whole file as text, decompressing it if `path` ends with `.gz`.
pub fn read_text<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let p = path.as_ref();
    let file = File::open(p)?;

    let mut reader: Box<dyn Read> = if is_gz(p) {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Output sink; `.gz` paths are gzip-compressed and `-` is stdout.
///
/// [`Output::finish`] must be called once everything is written: it writes
/// the gzip trailer and reports errors a drop would swallow.
enum Output {
    Stdout(BufWriter<io::Stdout>),
    File(BufWriter<File>),
    Gz(BufWriter<GzEncoder<File>>),
}

impl Output {
    fn create(path: &Path) -> io::Result<Self> {
        if path.as_os_str() == "-" {
            return Ok(Output::Stdout(BufWriter::new(io::stdout())));
        }
        let f = File::create(path)?;
        if is_gz(path) {
            let enc = GzEncoder::new(f, Compression::default());
            Ok(Output::Gz(BufWriter::new(enc)))
        } else {
            Ok(Output::File(BufWriter::new(f)))
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Output::Stdout(mut w) => w.flush(),
            Output::File(mut w) => w.flush(),
            Output::Gz(w) => {
                w.into_inner()
                    .map_err(io::IntoInnerError::into_error)?
                    .finish()?;
                Ok(())
            }
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(w) => w.write(buf),
            Output::File(w) => w.write(buf),
            Output::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(w) => w.flush(),
            Output::File(w) => w.flush(),
            Output::Gz(w) => w.flush(),
        }
    }
}

/// Read every `;`-terminated tree in a Newick file.
pub fn read_trees<P: AsRef<Path>>(path: P) -> Result<Vec<Node>, TreeError> {
    let text = read_text(path)?;
    Ok(parse_all(&text)?)
}

/// Read the first tree of a Newick file; further trees are ignored with a
/// warning.
pub fn read_tree<P: AsRef<Path>>(path: P) -> Result<Node, TreeError> {
    let p = path.as_ref();
    let trees = read_trees(p)?;
    if trees.len() > 1 {
        warn!(
            "{} holds {} trees, using the first one",
            p.display(),
            trees.len()
        );
    }
    trees
        .into_iter()
        .next()
        .ok_or(TreeError::Newick(NewickError::Empty))
}

/// Parse a leaf mapping table: one pair per line, left name then right name,
/// separated by whitespace.
///
/// `\r\n`, `\r` and `\n` line ends are all accepted. Blank lines are skipped,
/// as are lines with a single field (with a warning). Columns past the second
/// are ignored.
pub fn parse_mapping_table(text: &str) -> Vec<(String, String)> {
    text.split("\r\n")
        .flat_map(|chunk| chunk.split(['\r', '\n']))
        .enumerate()
        .filter_map(|(idx, line)| {
            let mut fields = line.split_whitespace();
            let left = fields.next()?;
            match fields.next() {
                Some(right) => Some((left.to_string(), right.to_string())),
                None => {
                    warn!("Mapping line {} has a single field '{left}', skipped", idx + 1);
                    None
                }
            }
        })
        .collect()
}

pub fn read_mapping_table<P: AsRef<Path>>(path: P) -> io::Result<Vec<(String, String)>> {
    Ok(parse_mapping_table(&read_text(path)?))
}

/// Write trees as Newick, one per line.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// If `path` equals `-`, the trees are written to stdout.
pub fn write_newick<P: AsRef<Path>>(path: P, trees: &[Node]) -> io::Result<()> {
    let mut out = Output::create(path.as_ref())?;
    for tree in trees {
        writeln!(&mut out, "{}", to_newick(tree))?;
    }
    out.finish()
}

/// Write per-leaf disorder as TSV, one row per movable leaf.
///
/// Columns: `tree`, `leaf`, `position`, `standard_position`, `deviation`.
/// Leaves without a partner get `NA` in the last three.
pub fn write_report_tsv<P: AsRef<Path>>(
    path: P,
    reports: &[(String, &DisorderReport)],
) -> io::Result<()> {
    let mut out = Output::create(path.as_ref())?;

    writeln!(&mut out, "tree\tleaf\tposition\tstandard_position\tdeviation")?;
    for (tree, report) in reports {
        for d in &report.deviations {
            writeln!(
                &mut out,
                "{tree}\t{}\t{}\t{}\t{}",
                d.leaf, d.position, d.standard_position, d.deviation
            )?;
        }
        for leaf in &report.skipped {
            writeln!(&mut out, "{tree}\t{leaf}\tNA\tNA\tNA")?;
        }
    }

    out.finish()
}
