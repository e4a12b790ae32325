//! Terminal styling utilities
//!
//! Semantic colors for command output:
//! - green/yellow for status
//! - cyan for headers and technical terms
//! - dim for secondary information

use crossterm::style::Stylize;

/// Extension trait for consistent DASW styling
///
/// # Examples
///
/// ```
/// use crossterm::style::Stylize;
/// use dasw::style::DaswStyle;
///
/// println!("{}", "DISPLAYS:".header());
/// println!("{}", "aligned".success());
/// ```
pub trait DaswStyle: Stylize {
    /// Section headers (cyan bold)
    fn header(self) -> <<Self as Stylize>::Styled as Stylize>::Styled
    where
        Self: Sized,
        <Self as Stylize>::Styled: Stylize,
    {
        self.cyan().bold()
    }

    /// Positive states (green)
    fn success(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.green()
    }

    /// Attention needed but not broken (yellow)
    fn warning(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.yellow()
    }

    /// Ids, paths, device classes (cyan)
    fn technical(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.cyan()
    }
}

impl<T: Stylize> DaswStyle for T {}
