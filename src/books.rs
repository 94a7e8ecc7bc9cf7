/// Static metadata for the 66 canonical books.
///
/// Ids match the on-disk directory names of the chapter data
/// (lowercase, spaces as underscores, e.g. `1_samuel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub id: &'static str,
    pub name: &'static str,
    pub chapters: u32,
}

pub const BOOKS: &[Book] = &[
    Book { id: "genesis", name: "Genesis", chapters: 50 },
    Book { id: "exodus", name: "Exodus", chapters: 40 },
    Book { id: "leviticus", name: "Leviticus", chapters: 27 },
    Book { id: "numbers", name: "Numbers", chapters: 36 },
    Book { id: "deuteronomy", name: "Deuteronomy", chapters: 34 },
    Book { id: "joshua", name: "Joshua", chapters: 24 },
    Book { id: "judges", name: "Judges", chapters: 21 },
    Book { id: "ruth", name: "Ruth", chapters: 4 },
    Book { id: "1_samuel", name: "1 Samuel", chapters: 31 },
    Book { id: "2_samuel", name: "2 Samuel", chapters: 24 },
    Book { id: "1_kings", name: "1 Kings", chapters: 22 },
    Book { id: "2_kings", name: "2 Kings", chapters: 25 },
    Book { id: "1_chronicles", name: "1 Chronicles", chapters: 29 },
    Book { id: "2_chronicles", name: "2 Chronicles", chapters: 36 },
    Book { id: "ezra", name: "Ezra", chapters: 10 },
    Book { id: "nehemiah", name: "Nehemiah", chapters: 13 },
    Book { id: "esther", name: "Esther", chapters: 10 },
    Book { id: "job", name: "Job", chapters: 42 },
    Book { id: "psalms", name: "Psalms", chapters: 150 },
    Book { id: "proverbs", name: "Proverbs", chapters: 31 },
    Book { id: "ecclesiastes", name: "Ecclesiastes", chapters: 12 },
    Book { id: "song_of_solomon", name: "Song of Solomon", chapters: 8 },
    Book { id: "isaiah", name: "Isaiah", chapters: 66 },
    Book { id: "jeremiah", name: "Jeremiah", chapters: 52 },
    Book { id: "lamentations", name: "Lamentations", chapters: 5 },
    Book { id: "ezekiel", name: "Ezekiel", chapters: 48 },
    Book { id: "daniel", name: "Daniel", chapters: 12 },
    Book { id: "hosea", name: "Hosea", chapters: 14 },
    Book { id: "joel", name: "Joel", chapters: 3 },
    Book { id: "amos", name: "Amos", chapters: 9 },
    Book { id: "obadiah", name: "Obadiah", chapters: 1 },
    Book { id: "jonah", name: "Jonah", chapters: 4 },
    Book { id: "micah", name: "Micah", chapters: 7 },
    Book { id: "nahum", name: "Nahum", chapters: 3 },
    Book { id: "habakkuk", name: "Habakkuk", chapters: 3 },
    Book { id: "zephaniah", name: "Zephaniah", chapters: 3 },
    Book { id: "haggai", name: "Haggai", chapters: 2 },
    Book { id: "zechariah", name: "Zechariah", chapters: 14 },
    Book { id: "malachi", name: "Malachi", chapters: 4 },
    Book { id: "matthew", name: "Matthew", chapters: 28 },
    Book { id: "mark", name: "Mark", chapters: 16 },
    Book { id: "luke", name: "Luke", chapters: 24 },
    Book { id: "john", name: "John", chapters: 21 },
    Book { id: "acts", name: "Acts", chapters: 28 },
    Book { id: "romans", name: "Romans", chapters: 16 },
    Book { id: "1_corinthians", name: "1 Corinthians", chapters: 16 },
    Book { id: "2_corinthians", name: "2 Corinthians", chapters: 13 },
    Book { id: "galatians", name: "Galatians", chapters: 6 },
    Book { id: "ephesians", name: "Ephesians", chapters: 6 },
    Book { id: "philippians", name: "Philippians", chapters: 4 },
    Book { id: "colossians", name: "Colossians", chapters: 4 },
    Book { id: "1_thessalonians", name: "1 Thessalonians", chapters: 5 },
    Book { id: "2_thessalonians", name: "2 Thessalonians", chapters: 3 },
    Book { id: "1_timothy", name: "1 Timothy", chapters: 6 },
    Book { id: "2_timothy", name: "2 Timothy", chapters: 4 },
    Book { id: "titus", name: "Titus", chapters: 3 },
    Book { id: "philemon", name: "Philemon", chapters: 1 },
    Book { id: "hebrews", name: "Hebrews", chapters: 13 },
    Book { id: "james", name: "James", chapters: 5 },
    Book { id: "1_peter", name: "1 Peter", chapters: 5 },
    Book { id: "2_peter", name: "2 Peter", chapters: 3 },
    Book { id: "1_john", name: "1 John", chapters: 5 },
    Book { id: "2_john", name: "2 John", chapters: 1 },
    Book { id: "3_john", name: "3 John", chapters: 1 },
    Book { id: "jude", name: "Jude", chapters: 1 },
    Book { id: "revelation", name: "Revelation", chapters: 22 },
];

pub fn find_book(id: &str) -> Option<&'static Book> {
    BOOKS.iter().find(|b| b.id == id)
}

/// Next chapter in canonical reading order, crossing book boundaries.
/// Returns None after Revelation 22.
pub fn next_chapter(book_id: &str, chapter: u32) -> Option<(&'static Book, u32)> {
    let idx = BOOKS.iter().position(|b| b.id == book_id)?;
    let book = &BOOKS[idx];
    if chapter < book.chapters {
        Some((book, chapter + 1))
    } else {
        BOOKS.get(idx + 1).map(|b| (b, 1))
    }
}

/// Previous chapter in canonical reading order.
/// Returns None before Genesis 1.
pub fn prev_chapter(book_id: &str, chapter: u32) -> Option<(&'static Book, u32)> {
    let idx = BOOKS.iter().position(|b| b.id == book_id)?;
    if chapter > 1 {
        Some((&BOOKS[idx], chapter - 1))
    } else if idx > 0 {
        let prev = &BOOKS[idx - 1];
        Some((prev, prev.chapters))
    } else {
        None
    }
}
