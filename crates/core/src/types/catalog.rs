//! Menu vocabularies: cuisines, categories, dietary labels, weekdays and
//! expense types.

use serde::{Deserialize, Serialize};

/// Cuisines offered on the product form and menu filter.
pub const CUISINES: &[&str] = &[
    "North Indian",
    "South Indian",
    "Chinese",
    "Italian",
    "Mexican",
    "Continental",
    "Desserts",
    "Beverages",
    "Arabian",
];

/// Menu categories a product can belong to.
pub const CATEGORIES: &[&str] = &[
    "Breakfast",
    "Lunch",
    "Dinner",
    "Snacks",
    "Main Course",
    "Rice Items",
    "Desserts",
    "Beverages",
    "Bread Items",
    "Thali",
];

/// Days a product can be marked available on.
pub const WEEKDAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Dietary and merchandising flags carried on a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DietaryInfo {
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub is_gluten_free: bool,
    pub is_eggless: bool,
    pub is_jain: bool,
    pub is_best_seller: bool,
}

impl DietaryInfo {
    /// Form field names paired with their labels, in display order.
    pub const FIELDS: [(&'static str, &'static str); 6] = [
        ("isVegetarian", "Vegetarian"),
        ("isVegan", "Vegan"),
        ("isGlutenFree", "Gluten Free"),
        ("isEggless", "Eggless"),
        ("isJain", "Jain"),
        ("isBestSeller", "Best Seller"),
    ];

    /// Labels for the dietary flags that are set. Best seller is a
    /// merchandising badge and is not listed here.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        [
            (self.is_vegetarian, "Vegetarian"),
            (self.is_vegan, "Vegan"),
            (self.is_gluten_free, "Gluten Free"),
            (self.is_eggless, "Eggless"),
            (self.is_jain, "Jain"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect()
    }

    /// Whether the flag for the given form field name is set.
    #[must_use]
    pub fn get(&self, field: &str) -> bool {
        match field {
            "isVegetarian" => self.is_vegetarian,
            "isVegan" => self.is_vegan,
            "isGlutenFree" => self.is_gluten_free,
            "isEggless" => self.is_eggless,
            "isJain" => self.is_jain,
            "isBestSeller" => self.is_best_seller,
            _ => false,
        }
    }

    /// Set a flag by form field name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: bool) {
        match field {
            "isVegetarian" => self.is_vegetarian = value,
            "isVegan" => self.is_vegan = value,
            "isGlutenFree" => self.is_gluten_free = value,
            "isEggless" => self.is_eggless = value,
            "isJain" => self.is_jain = value,
            "isBestSeller" => self.is_best_seller = value,
            _ => {}
        }
    }
}

/// Kind of operating expense recorded by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Salary,
    Inventory,
    Goods,
    Utilities,
    Maintenance,
}

impl ExpenseType {
    pub const ALL: [Self; 5] = [
        Self::Salary,
        Self::Inventory,
        Self::Goods,
        Self::Utilities,
        Self::Maintenance,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Inventory => "inventory",
            Self::Goods => "goods",
            Self::Utilities => "utilities",
            Self::Maintenance => "maintenance",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Salary => "Salary",
            Self::Inventory => "Inventory",
            Self::Goods => "Goods",
            Self::Utilities => "Utilities",
            Self::Maintenance => "Maintenance",
        }
    }
}

impl std::fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExpenseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("invalid expense type: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dietary_labels_skip_best_seller() {
        let info = DietaryInfo {
            is_vegetarian: true,
            is_jain: true,
            is_best_seller: true,
            ..DietaryInfo::default()
        };
        assert_eq!(info.labels(), vec!["Vegetarian", "Jain"]);
    }

    #[test]
    fn test_dietary_set_by_field_name() {
        let mut info = DietaryInfo::default();
        info.set("isGlutenFree", true);
        info.set("isSpicy", true);
        assert!(info.get("isGlutenFree"));
        assert_eq!(info.labels(), vec!["Gluten Free"]);
    }

    #[test]
    fn test_dietary_info_wire_shape() {
        let info: DietaryInfo = serde_json::from_str(r#"{"isVegan":true}"#).unwrap();
        assert!(info.is_vegan);
        assert!(!info.is_vegetarian);
    }

    #[test]
    fn test_expense_type_parse() {
        assert_eq!(
            "utilities".parse::<ExpenseType>().unwrap(),
            ExpenseType::Utilities
        );
        assert!("rent".parse::<ExpenseType>().is_err());
    }
}
