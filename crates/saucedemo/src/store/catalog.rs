// Product catalog and sort orders of the demo store

use std::cmp::Reverse;
use std::fmt;

/// One product on the inventory page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub id: u32,
    /// Suffix of the add/remove button `data-test` values
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price_cents: u32,
}

/// Formats cents the way the store prints money, e.g. `$29.99`.
pub fn format_price(cents: u32) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

impl Product {
    pub fn price(&self) -> String {
        format_price(self.price_cents)
    }

    pub fn add_button(&self) -> String {
        format!("add-to-cart-{}", self.slug)
    }

    pub fn remove_button(&self) -> String {
        format!("remove-{}", self.slug)
    }
}

/// Every product, in the store's default (name ascending) order.
pub const PRODUCTS: [Product; 6] = [
    Product {
        id: 4,
        slug: "sauce-labs-backpack",
        name: "Sauce Labs Backpack",
        description: "carry.allTheThings() with the sleek, streamlined Sly Pack that melds uncompromising style with unequaled laptop and tablet protection.",
        price_cents: 2999,
    },
    Product {
        id: 0,
        slug: "sauce-labs-bike-light",
        name: "Sauce Labs Bike Light",
        description: "A red light isn't the desired state in testing but it sure helps when riding your bike at night. Water-resistant with 3 lighting modes, 1 AAA battery included.",
        price_cents: 999,
    },
    Product {
        id: 1,
        slug: "sauce-labs-bolt-t-shirt",
        name: "Sauce Labs Bolt T-Shirt",
        description: "Get your testing superhero on with the Sauce Labs bolt T-shirt. From American Apparel, 100% ringspun combed cotton, heather gray with red bolt.",
        price_cents: 1599,
    },
    Product {
        id: 5,
        slug: "sauce-labs-fleece-jacket",
        name: "Sauce Labs Fleece Jacket",
        description: "It's not every day that you come across a midweight quarter-zip fleece jacket capable of handling everything from a relaxing day outdoors to a busy day at the office.",
        price_cents: 4999,
    },
    Product {
        id: 2,
        slug: "sauce-labs-onesie",
        name: "Sauce Labs Onesie",
        description: "Rib snap infant onesie for the junior automation engineer in development. Reinforced 3-snap bottom closure, two-needle hemmed sleeved and bottom won't unravel.",
        price_cents: 799,
    },
    Product {
        id: 3,
        slug: "test.allthethings()-t-shirt-(red)",
        name: "Test.allTheThings() T-Shirt (Red)",
        description: "This classic Sauce Labs t-shirt is perfect to wear when cozying up to your keyboard to automate a few tests. Super-soft and comfy ringspun combed cotton.",
        price_cents: 1599,
    },
];

pub fn find(slug: &str) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.slug == slug)
}

pub fn find_by_id(id: u32) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Sort orders offered by the product sort dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::PriceAsc,
        SortOrder::PriceDesc,
    ];

    /// Option value in the dropdown.
    pub fn value(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "az",
            SortOrder::NameDesc => "za",
            SortOrder::PriceAsc => "lohi",
            SortOrder::PriceDesc => "hilo",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "Name (A to Z)",
            SortOrder::NameDesc => "Name (Z to A)",
            SortOrder::PriceAsc => "Price (low to high)",
            SortOrder::PriceDesc => "Price (high to low)",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.value() == value)
    }

    /// The catalog in this order. Ties keep the default order.
    pub fn sorted(self) -> Vec<&'static Product> {
        let mut products: Vec<&'static Product> = PRODUCTS.iter().collect();
        match self {
            SortOrder::NameAsc => products.sort_by_key(|p| p.name),
            SortOrder::NameDesc => products.sort_by_key(|p| Reverse(p.name)),
            SortOrder::PriceAsc => products.sort_by_key(|p| p.price_cents),
            SortOrder::PriceDesc => products.sort_by_key(|p| Reverse(p.price_cents)),
        }
        products
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
