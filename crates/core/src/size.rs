use crate::record::UNKNOWN;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Render a byte count as a human label in megabytes, e.g. `"12.3 MB"`.
///
/// Missing or zero sizes render as [`UNKNOWN`].
#[must_use]
pub fn size_label(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) if b > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let mb = b as f64 / BYTES_PER_MB;
            let mut text = format!("{mb:.2}");
            while text.ends_with('0') && !text.ends_with(".0") {
                text.pop();
            }
            format!("{text} MB")
        }
        _ => UNKNOWN.to_owned(),
    }
}
