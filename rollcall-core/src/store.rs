//! Attendance record store
//!
//! Owns the roster and the attendance history. Mutating operations enforce
//! the data-model invariants (unique ids, per-class unique numbers, cascade on
//! delete); the analytics functions only ever see a shared reference.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{Database, RECORDS_KEY};
use crate::error::{Error, Result};
use crate::types::{
    date_key, AttendanceEntry, AttendanceHistory, ClassId, Roster, Student, StudentId,
};

/// Roster plus attendance history, persisted as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStore {
    #[serde(default)]
    pub students: Roster,
    #[serde(default)]
    pub attendance: AttendanceHistory,
}

impl RecordStore {
    /// Fresh store with empty `classes` and an empty entry for `today`.
    pub fn initial(classes: &[String], today: NaiveDate) -> Self {
        let mut store = Self::default();
        store.reset(classes, today);
        store
    }

    /// Load the persisted store, seeding and saving a fresh one on first run.
    pub fn load(db: &Database, default_classes: &[String], today: NaiveDate) -> Result<Self> {
        if let Some(store) = db.get_json::<RecordStore>(RECORDS_KEY)? {
            tracing::debug!(
                classes = store.students.len(),
                dates = store.attendance.len(),
                "Loaded attendance records"
            );
            return Ok(store);
        }

        tracing::info!("No attendance records found, initializing");
        let store = Self::initial(default_classes, today);
        store.save(db)?;
        Ok(store)
    }

    /// Persist the whole store.
    pub fn save(&self, db: &Database) -> Result<()> {
        db.set_json(RECORDS_KEY, self)
    }

    /// Drop all data and start over with `classes`.
    pub fn reset(&mut self, classes: &[String], today: NaiveDate) {
        self.students = classes
            .iter()
            .map(|c| (c.clone(), Vec::new()))
            .collect();
        let day = classes
            .iter()
            .map(|c| (c.clone(), Default::default()))
            .collect();
        self.attendance = AttendanceHistory::new();
        self.attendance.insert(date_key(today), day);
    }

    // ============================================
    // Queries
    // ============================================

    /// Class names in display order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassId> {
        self.students.keys()
    }

    /// Students of one class, in roster order.
    pub fn students_in(&self, class_id: &str) -> Result<&[Student]> {
        self.students
            .get(class_id)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::NotFound(format!("class {}", class_id)))
    }

    /// Find a student and the class it belongs to.
    pub fn student_by_id(&self, id: StudentId) -> Option<(&ClassId, &Student)> {
        self.students.iter().find_map(|(class_id, students)| {
            students
                .iter()
                .find(|s| s.id == id)
                .map(|student| (class_id, student))
        })
    }

    /// Next free student id (one past the largest in any class).
    pub fn next_student_id(&self) -> StudentId {
        self.students
            .values()
            .flatten()
            .map(|s| s.id)
            .max()
            .unwrap_or(0)
            + 1
    }

    // ============================================
    // Roster mutation
    // ============================================

    /// Add an empty class, registering it on every recorded date.
    pub fn add_class(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("class name must not be empty".to_string()));
        }
        if self.students.contains_key(name) {
            return Err(Error::Validation(format!("class {} already exists", name)));
        }

        self.students.insert(name.to_string(), Vec::new());
        for day in self.attendance.values_mut() {
            day.entry(name.to_string()).or_default();
        }

        tracing::info!(class = %name, "Added class");
        Ok(())
    }

    /// Add a student to `class_id`, returning the new student.
    pub fn add_student(&mut self, class_id: &str, number: u32, name: &str) -> Result<Student> {
        let name = validate_student_fields(number, name)?;
        let id = self.next_student_id();

        let students = self
            .students
            .get_mut(class_id)
            .ok_or_else(|| Error::NotFound(format!("class {}", class_id)))?;
        if students.iter().any(|s| s.number == number) {
            return Err(Error::Validation(format!(
                "number {} is already taken in class {}",
                number, class_id
            )));
        }

        let student = Student {
            id,
            number,
            name: name.to_string(),
        };
        students.push(student.clone());

        tracing::info!(class = %class_id, id, number, "Added student");
        Ok(student)
    }

    /// Change a student's number and name.
    pub fn edit_student(&mut self, id: StudentId, number: u32, name: &str) -> Result<Student> {
        let name = validate_student_fields(number, name)?;

        let (class_id, students) = self
            .students
            .iter_mut()
            .find(|(_, students)| students.iter().any(|s| s.id == id))
            .ok_or_else(|| Error::NotFound(format!("student {}", id)))?;

        if students.iter().any(|s| s.id != id && s.number == number) {
            return Err(Error::Validation(format!(
                "number {} is already taken in class {}",
                number, class_id
            )));
        }

        let student = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("student {}", id)))?;
        student.number = number;
        student.name = name.to_string();

        tracing::info!(id, number, "Edited student");
        Ok(student.clone())
    }

    /// Remove a student and every attendance entry recorded for them.
    pub fn delete_student(&mut self, id: StudentId) -> Result<Student> {
        let (class_id, index) = self
            .students
            .iter()
            .find_map(|(class_id, students)| {
                students
                    .iter()
                    .position(|s| s.id == id)
                    .map(|index| (class_id.clone(), index))
            })
            .ok_or_else(|| Error::NotFound(format!("student {}", id)))?;

        let student = self
            .students
            .get_mut(&class_id)
            .map(|students| students.remove(index))
            .ok_or_else(|| Error::NotFound(format!("class {}", class_id)))?;

        let mut removed_entries = 0usize;
        for day in self.attendance.values_mut() {
            for class_attendance in day.values_mut() {
                if class_attendance.remove(&id).is_some() {
                    removed_entries += 1;
                }
            }
        }

        tracing::info!(id, class = %class_id, removed_entries, "Deleted student");
        Ok(student)
    }

    // ============================================
    // Attendance
    // ============================================

    /// Record (or overwrite) one student's status for one date.
    pub fn record_attendance(
        &mut self,
        date: NaiveDate,
        class_id: &str,
        student_id: StudentId,
        entry: AttendanceEntry,
    ) -> Result<()> {
        let students = self.students_in(class_id)?;
        if !students.iter().any(|s| s.id == student_id) {
            return Err(Error::Validation(format!(
                "student {} is not in class {}",
                student_id, class_id
            )));
        }

        self.attendance
            .entry(date_key(date))
            .or_default()
            .entry(class_id.to_string())
            .or_default()
            .insert(student_id, entry);
        Ok(())
    }

    /// Entry for one student on one date, if recorded.
    pub fn entry_on(
        &self,
        date: NaiveDate,
        class_id: &str,
        student_id: StudentId,
    ) -> Option<&AttendanceEntry> {
        self.attendance
            .get(&date_key(date))
            .and_then(|day| day.get(class_id))
            .and_then(|class| class.get(&student_id))
    }
}

fn validate_student_fields(number: u32, name: &str) -> Result<&str> {
    if number == 0 {
        return Err(Error::Validation(
            "student number must be at least 1".to_string(),
        ));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation(
            "student name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttendanceStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn classes() -> Vec<String> {
        vec!["1".to_string(), "2".to_string()]
    }

    fn store() -> RecordStore {
        RecordStore::initial(&classes(), today())
    }

    #[test]
    fn test_initial_store_has_classes_and_today() {
        let store = store();
        assert_eq!(store.classes().count(), 2);
        assert_eq!(store.attendance.len(), 1);
        assert!(store.attendance["2024-03-04"].contains_key("1"));
    }

    #[test]
    fn test_ids_are_global_and_monotonic() {
        let mut store = store();
        let a = store.add_student("1", 1, "Kim").unwrap();
        let b = store.add_student("2", 1, "Lee").unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.next_student_id(), 3);
    }

    #[test]
    fn test_number_unique_within_class_only() {
        let mut store = store();
        store.add_student("1", 7, "Kim").unwrap();
        let err = store.add_student("1", 7, "Park").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(store.add_student("2", 7, "Park").is_ok());
    }

    #[test]
    fn test_add_student_rejects_bad_input() {
        let mut store = store();
        assert!(matches!(
            store.add_student("1", 0, "Kim"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.add_student("1", 1, "   "),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.add_student("9", 1, "Kim"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_add_student_trims_name() {
        let mut store = store();
        let student = store.add_student("1", 1, "  Kim  ").unwrap();
        assert_eq!(student.name, "Kim");
    }

    #[test]
    fn test_edit_student() {
        let mut store = store();
        let kim = store.add_student("1", 1, "Kim").unwrap();
        store.add_student("1", 2, "Lee").unwrap();

        // Keeping one's own number is fine
        let edited = store.edit_student(kim.id, 1, "Kim Minji").unwrap();
        assert_eq!(edited.name, "Kim Minji");

        // Taking a classmate's number is not
        assert!(matches!(
            store.edit_student(kim.id, 2, "Kim"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.edit_student(99, 3, "Ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_student_cascades() {
        let mut store = store();
        let kim = store.add_student("1", 1, "Kim").unwrap();
        let lee = store.add_student("1", 2, "Lee").unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        for date in [today(), day2] {
            store
                .record_attendance(date, "1", kim.id, AttendanceEntry::new(AttendanceStatus::Late))
                .unwrap();
            store
                .record_attendance(date, "1", lee.id, AttendanceEntry::new(AttendanceStatus::Present))
                .unwrap();
        }

        store.delete_student(kim.id).unwrap();

        assert!(store.student_by_id(kim.id).is_none());
        assert!(store.entry_on(today(), "1", kim.id).is_none());
        assert!(store.entry_on(day2, "1", kim.id).is_none());
        assert!(store.entry_on(day2, "1", lee.id).is_some());
        assert!(matches!(store.delete_student(kim.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_add_class_registers_on_existing_dates() {
        let mut store = store();
        store.add_class("3-B").unwrap();
        assert!(store.attendance["2024-03-04"].contains_key("3-B"));
        assert!(matches!(store.add_class("3-B"), Err(Error::Validation(_))));
        assert!(matches!(store.add_class(" "), Err(Error::Validation(_))));
    }

    #[test]
    fn test_record_attendance_requires_membership() {
        let mut store = store();
        let kim = store.add_student("1", 1, "Kim").unwrap();
        let entry = AttendanceEntry::new(AttendanceStatus::Absent);

        assert!(matches!(
            store.record_attendance(today(), "2", kim.id, entry.clone()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.record_attendance(today(), "9", kim.id, entry.clone()),
            Err(Error::NotFound(_))
        ));

        store.record_attendance(today(), "1", kim.id, entry).unwrap();
        assert_eq!(
            store.entry_on(today(), "1", kim.id).map(|e| e.status),
            Some(AttendanceStatus::Absent)
        );
    }

    #[test]
    fn test_load_seeds_then_round_trips() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();

        let mut store = RecordStore::load(&db, &classes(), today()).unwrap();
        assert_eq!(store, RecordStore::initial(&classes(), today()));

        store.add_student("2", 4, "Choi").unwrap();
        store.save(&db).unwrap();

        let reloaded = RecordStore::load(&db, &[], today()).unwrap();
        assert_eq!(reloaded, store);
    }

    #[test]
    fn test_reads_legacy_json_layout() {
        let json = r#"{
            "students": {"1": [{"id": 3, "number": 1, "name": "Kim"}]},
            "attendance": {"2024-03-04": {"1": {"3": {"status": "present", "reason": "", "note": ""}}}}
        }"#;
        let store: RecordStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.next_student_id(), 4);
        assert_eq!(
            store.entry_on(today(), "1", 3).map(|e| e.status),
            Some(AttendanceStatus::Present)
        );
    }
}
