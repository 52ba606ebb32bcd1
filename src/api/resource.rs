use color_eyre::{eyre::eyre, Result};
use std::fmt;
use std::str::FromStr;

/// Paginated resources the list views browse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resource {
  Shops,
  Products,
  #[default]
  Distributions,
  Invoices,
}

impl Resource {
  pub const ALL: [Resource; 4] = [
    Resource::Shops,
    Resource::Products,
    Resource::Distributions,
    Resource::Invoices,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Resource::Shops => "shops",
      Resource::Products => "products",
      Resource::Distributions => "distributions",
      Resource::Invoices => "invoices",
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Resource::Shops => "Shops",
      Resource::Products => "Products",
      Resource::Distributions => "Distributions",
      Resource::Invoices => "Invoices",
    }
  }

  /// Path relative to the API base URL.
  pub fn path(&self) -> &'static str {
    match self {
      Resource::Shops => "retailer/shops",
      Resource::Products => "retailer/products",
      Resource::Distributions => "retailer/distributions",
      Resource::Invoices => "staff/invoices",
    }
  }

  /// Envelope fields that may hold the item list, in priority order.
  pub fn item_fields(&self) -> &'static [&'static str] {
    match self {
      Resource::Shops => &["items", "shops"],
      Resource::Products => &["items", "products"],
      Resource::Distributions => &["items", "distributions"],
      Resource::Invoices => &["items", "invoices"],
    }
  }

  /// Filter keys the list view owns in the query string.
  pub fn filter_keys(&self) -> &'static [&'static str] {
    match self {
      Resource::Shops => &["search", "status"],
      Resource::Products => &["search", "category", "brand"],
      Resource::Distributions => &["shopId", "deliveryStatus", "dateFrom", "dateTo"],
      Resource::Invoices => &["search", "status", "dateFrom", "dateTo"],
    }
  }

  /// Row fields shown by the list view, with column widths.
  pub fn columns(&self) -> &'static [(&'static str, usize)] {
    match self {
      Resource::Shops => &[("id", 10), ("name", 28), ("city", 16), ("status", 10)],
      Resource::Products => &[("sku", 14), ("name", 30), ("brand", 16), ("quantity", 8)],
      Resource::Distributions => &[
        ("id", 10),
        ("shopName", 24),
        ("deliveryStatus", 14),
        ("createdAt", 20),
      ],
      Resource::Invoices => &[
        ("invoiceNumber", 14),
        ("patientName", 24),
        ("status", 10),
        ("totalAmount", 12),
      ],
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Resource {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    let wanted = s.trim().to_lowercase();
    Resource::ALL
      .into_iter()
      .find(|r| r.name() == wanted)
      .ok_or_else(|| eyre!("Unknown resource '{}'", s))
  }
}
