//! Terminal rendering of the product card.

use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use foodscan_core::view::EntranceAnimation;
use foodscan_core::{ImageAsset, ProductCard, ProductView};

/// Animation offset units per terminal column.
const OFFSET_SCALE: f32 = 10.0;
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

struct Inner<W> {
    out: W,
    card: Option<ProductCard>,
}

/// Prints status lines and the product card to a writer.
pub struct TerminalView<W: Write + Send> {
    inner: Mutex<Inner<W>>,
    animation: Option<EntranceAnimation>,
}

impl<W: Write + Send> TerminalView<W> {
    /// `animation` of `None` prints the card in place with no slide-in.
    pub fn new(out: W, animation: Option<EntranceAnimation>) -> Self {
        Self {
            inner: Mutex::new(Inner { out, card: None }),
            animation,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok(inner) => inner.out,
            Err(poisoned) => poisoned.into_inner().out,
        }
    }

    fn with_inner<F: FnOnce(&mut Inner<W>) -> std::io::Result<()>>(&self, f: F) {
        let mut inner = match self.inner.lock() {
            Ok(i) => i,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = f(&mut *inner).and_then(|_| inner.out.flush()) {
            tracing::warn!(error = %e, "failed to write to terminal");
        }
    }
}

fn card_lines(card: &ProductCard) -> [String; 2] {
    [
        format!("Brand:       {}", card.brand),
        format!("Ingredients: {}", card.ingredients),
    ]
}

fn write_image_line<W: Write>(out: &mut W, image: &ImageAsset) -> std::io::Result<()> {
    match image {
        ImageAsset::Loaded(img) => {
            let format = img
                .format
                .map(|f| format!("{:?}", f).to_lowercase())
                .unwrap_or_else(|| "unknown".to_string());
            writeln!(
                out,
                "Image:       {}x{} {} ({})",
                img.width(),
                img.height(),
                format,
                img.source_url
            )
        }
        ImageAsset::Placeholder => writeln!(out, "Image:       [placeholder]"),
    }
}

impl<W: Write + Send> ProductView for TerminalView<W> {
    fn set_status(&self, status: &str) {
        self.with_inner(|inner| writeln!(inner.out, "{}", status));
    }

    fn show_product(&self, card: &ProductCard) {
        let animated = self.animation.is_some();
        self.with_inner(|inner| {
            if animated {
                // Drawn by play_entrance, or by show_image if no entrance runs.
                inner.card = Some(card.clone());
                return Ok(());
            }
            for line in card_lines(card) {
                writeln!(inner.out, "{}", line)?;
            }
            Ok(())
        });
    }

    fn show_image(&self, image: &ImageAsset) {
        self.with_inner(|inner| {
            // A card with no entrance (the failure card) is drawn in place
            // so the image line always follows it.
            if let Some(card) = inner.card.take() {
                for line in card_lines(&card) {
                    writeln!(inner.out, "{}", line)?;
                }
            }
            write_image_line(&mut inner.out, image)
        });
    }

    fn play_entrance(&self) {
        let Some(animation) = self.animation else {
            return;
        };

        self.with_inner(|inner| {
            let Some(card) = inner.card.take() else {
                return Ok(());
            };
            let lines = card_lines(&card);

            tokio::task::block_in_place(|| -> std::io::Result<()> {
                let mut elapsed = Duration::ZERO;
                let mut first = true;
                loop {
                    let frame = animation.frame_at(elapsed);
                    if !first {
                        // Back to the top of the card.
                        write!(inner.out, "\x1b[{}A", lines.len())?;
                    }
                    first = false;

                    let indent = " ".repeat((frame.translation_x / OFFSET_SCALE).round() as usize);
                    let dim = frame.alpha < 0.5;
                    for line in &lines {
                        if dim {
                            writeln!(inner.out, "\x1b[2K{}\x1b[2m{}\x1b[0m", indent, line)?;
                        } else {
                            writeln!(inner.out, "\x1b[2K{}{}", indent, line)?;
                        }
                    }
                    inner.out.flush()?;

                    if elapsed >= animation.duration {
                        return Ok(());
                    }
                    std::thread::sleep(FRAME_INTERVAL);
                    elapsed += FRAME_INTERVAL;
                }
            })
        });
    }
}

/// Discards everything; used when results are printed as JSON instead.
pub struct NullView;

impl ProductView for NullView {
    fn set_status(&self, _status: &str) {}

    fn show_product(&self, _card: &ProductCard) {}

    fn show_image(&self, _image: &ImageAsset) {}
}
