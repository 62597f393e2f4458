use async_trait::async_trait;
use console::style;

use lookup_engine::{Surface, TextBlock};

/// Renders replies to stdout.
pub struct TerminalSurface;

#[async_trait]
impl Surface for TerminalSurface {
    async fn notice(&self, text: &str) {
        println!("{text}");
    }

    async fn block(&self, block: &TextBlock) {
        println!();
        println!("{}", style(&block.title).bold());
        println!("{}", block.body());
        println!("{}", style(&block.footer).dim());
    }
}
