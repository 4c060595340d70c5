use crate::db::Database;
use crate::error::StoreError;
use crate::models::{Category, Person};

/// Filters for the people list. Empty search and no category match everyone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub search: String,
    pub category: Option<Category>,
}

impl DirectoryFilter {
    pub fn matches(&self, person: &Person) -> bool {
        if let Some(category) = self.category {
            if person.category != category {
                return false;
            }
        }
        matches_search(person, &self.search)
    }
}

/// Case-insensitive substring match over nickname and features.
pub fn matches_search(person: &Person, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }
    person.nickname.to_lowercase().contains(&term) || person.features.to_lowercase().contains(&term)
}

/// Everyone matching the filter, sorted by nickname.
pub fn list_people(db: &Database, filter: &DirectoryFilter) -> Result<Vec<Person>, StoreError> {
    Ok(db
        .list_persons()?
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Database {
        let db = Database::open_memory().unwrap();
        for (name, features, category) in [
            ("Taro", "blue jacket", Category::Regular),
            ("aoi", "walks with a dog", Category::New),
            ("Ken", "Dog lover, red cap", Category::Occasional),
        ] {
            let mut p = Person::new(name);
            p.features = features.to_string();
            p.category = category;
            db.insert_person(&p).unwrap();
        }
        db
    }

    fn names(people: Vec<Person>) -> Vec<String> {
        people.into_iter().map(|p| p.nickname).collect()
    }

    #[test]
    fn test_no_filter_lists_everyone_sorted() {
        let db = setup_test_db();
        let people = list_people(&db, &DirectoryFilter::default()).unwrap();
        assert_eq!(people.len(), 3);
        assert_eq!(people[0].nickname, "Ken");
    }

    #[test]
    fn test_search_is_case_insensitive_over_features() {
        let db = setup_test_db();
        let filter = DirectoryFilter {
            search: "DOG".to_string(),
            category: None,
        };
        let mut found = names(list_people(&db, &filter).unwrap());
        found.sort();
        assert_eq!(found, vec!["Ken", "aoi"]);
    }

    #[test]
    fn test_category_and_search_combine() {
        let db = setup_test_db();
        let filter = DirectoryFilter {
            search: "dog".to_string(),
            category: Some(Category::New),
        };
        assert_eq!(names(list_people(&db, &filter).unwrap()), vec!["aoi"]);

        let filter = DirectoryFilter {
            search: String::new(),
            category: Some(Category::Regular),
        };
        assert_eq!(names(list_people(&db, &filter).unwrap()), vec!["Taro"]);
    }
}
