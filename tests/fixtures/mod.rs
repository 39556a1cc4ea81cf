//! CSV payloads shared by the integration tests

#![allow(dead_code)]

pub const STUDENT_HEADER: &str =
    "type,firstName,lastName,pesel,height,weight,email,university,studyYear,fieldOfStudy,scholarship";

/// Three valid students, comma separated.
pub const STUDENTS_CSV: &str = "\
type,firstName,lastName,pesel,height,weight,email,university,studyYear,fieldOfStudy,scholarship
STUDENT,John,Smith,12345678901,180,75,john.smith@example.com,University of Testing,1,Computer Science,1200
STUDENT,Alice,Green,12345678902,165.5,58,alice.green@example.com,University of Testing,3,Mathematics,800.50
student,Piotr,Nowak,12345678903,182,80,piotr.nowak@example.com,AGH,2,Physics,0
";

/// One row of each type, semicolon separated with comma decimals.
pub const MIXED_SEMICOLON_CSV: &str = "\
type;firstname;lastname;pesel;height;weight;email;university;studyyear;fieldofstudy;scholarship;startdate;currentposition;currentsalary;pensionamount;yearsworked
STUDENT;John;Smith;22345678901;180,5;75;john@example.com;University of Testing;1;Computer Science;1200,50;;;;;
EMPLOYEE;Anna;Jones;22345678902;170;60;anna.jones@example.com;;;;;2020-01-01;Engineer;6500,00;;
RETIREE;Mark;Brown;22345678903;175;82,3;mark.brown@example.com;;;;;;;;2500;35
";

/// Header lacks the `email` column.
pub const MISSING_EMAIL_COLUMN_CSV: &str = "\
type,firstname,lastname,pesel,height,weight
STUDENT,John,Smith,32345678901,180,75
";

/// Rows 2-4 are valid, row 5 has an unparseable start date.
pub const BAD_DATE_AT_ROW_5_CSV: &str = "\
type,firstname,lastname,pesel,height,weight,email,startdate,currentposition,currentsalary
EMPLOYEE,Anna,Jones,42345678901,170,60,anna@example.com,2020-01-01,Engineer,6500
EMPLOYEE,Tom,White,42345678902,181,90,tom@example.com,2019-05-20,Manager,9100
EMPLOYEE,Eva,Black,42345678903,168,57,eva@example.com,2021-11-30,Analyst,5200
EMPLOYEE,Jan,Kowalski,42345678904,177,77,jan@example.com,01/02/2020,Tester,4800
";

/// Single employee whose salary is not a number.
pub const NON_NUMERIC_SALARY_CSV: &str = "\
type,firstname,lastname,pesel,height,weight,email,startdate,currentposition,currentsalary
EMPLOYEE,Anna,Jones,52345678901,170,60,anna@example.com,2020-01-01,Engineer,abc
";

/// Single valid employee.
pub const EMPLOYEE_CSV: &str = "\
type,firstname,lastname,pesel,height,weight,email,startdate,currentposition,currentsalary
EMPLOYEE,Anna,Jones,62345678901,170,60,anna.jones@example.com,2020-01-01,Engineer,6500
";

/// The second and fourth rows share a pesel.
pub const DUPLICATE_PESEL_CSV: &str = "\
type,firstname,lastname,pesel,height,weight,email,pensionamount,yearsworked
RETIREE,Mark,Brown,72345678901,175,82,mark@example.com,2500,35
RETIREE,Jane,Doe,72345678902,160,55,jane@example.com,2100,30
RETIREE,Mark,Copy,72345678901,175,82,copy@example.com,2500,35
";

/// Header only.
pub const HEADER_ONLY_CSV: &str = "type,firstname,lastname,pesel,height,weight,email\n";

/// `count` valid students with distinct pesels starting at `first_pesel`.
pub fn generate_students(count: usize, first_pesel: u64) -> String {
    let mut csv = String::from(STUDENT_HEADER);
    csv.push('\n');
    for i in 0..count as u64 {
        csv.push_str(&format!(
            "STUDENT,Student{i},Generated,{:011},170,65,student{i}@example.com,Test University,1,Biology,100\n",
            first_pesel + i
        ));
    }
    csv
}

/// Blank and whitespace-only lines around valid rows, with CRLF endings.
pub const BLANK_LINES_CSV: &str = "type,firstname,lastname,pesel,height,weight,email,pensionamount,yearsworked\r\n\r\nRETIREE,Mark,Brown,73345678901,175,82,mark@example.com,2500,35\r\n   \r\nRETIREE,Jane,Doe,73345678902,160,55,jane@example.com,2100,30\r\n\r\n\r\n";

/// Line 2 is blank and line 4 whitespace-only; the bad value sits on physical line 5.
pub const BLANK_LINES_BAD_ROW_CSV: &str = "type,firstname,lastname,pesel,height,weight,email,pensionamount,yearsworked\n\nRETIREE,Mark,Brown,74345678901,175,82,mark@example.com,2500,35\n   \nRETIREE,Jane,Doe,74345678902,160,55,jane@example.com,abc,30\n";
